/*!
 * Core routing and transfer logic
 */

pub mod dry_run;
pub mod handler;
pub mod hardlink;
pub mod input;
pub mod paths;
pub mod rotation;
pub mod strategy;
pub mod timestamp;
pub mod transfer;

pub use handler::{DefaultHooks, Handler, ProcessHooks};
pub use input::InputFile;
pub use rotation::OutputRotation;
pub use strategy::{PathStrategy, RouteContext};
pub use transfer::{TransferExecutor, TransferMethod, TransferOutcome};
