/*!
 * Destination path strategies
 *
 * A handler picks one strategy from its configuration at construction and
 * applies it to every file it processes. Strategies are pure: the same file,
 * counter, processing time and output directory always give the same path.
 *
 * | Strategy  | Time source                         | Shape under the output directory           |
 * |-----------|-------------------------------------|--------------------------------------------|
 * | Mirror    | none                                | `<relative path>`                          |
 * | Ordered   | file mtime, or processing time      | `<top>/<time>/<slug>`                      |
 * | Cmag      | date token in the file name         | `<top>/<time>/<path below top>`            |
 * | Datorama  | file mtime                          | `<top>/<time>/<mtime epoch>/<slug>`        |
 * | Lotame    | date token in the directory name    | `<time>/<basename>`                        |
 * | Silverpop | export template in the file name    | `<top>/<YYYY>/<MM>/<path below top>`       |
 */

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::config::{HandlerConfig, OrderedStrategy};
use crate::core::input::InputFile;
use crate::core::paths::{
    daily_directory_for, format_time, path_below_top_level, relative_path_of, slug_for,
    top_level_of,
};
use crate::core::timestamp::{self, TimestampError};
use crate::error::{PrepError, Result};

/// Handler state a strategy may consult
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    pub config: &'a HandlerConfig,
    pub output_dir: &'a Path,
    pub counter: u64,
    pub processing_time: DateTime<Utc>,
}

/// The closed set of destination path strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStrategy {
    /// Same relative path as in the input directory
    Mirror,
    Ordered,
    Cmag,
    Datorama,
    Lotame,
    Silverpop,
}

impl PathStrategy {
    /// Select the strategy a handler with `config` uses
    pub fn from_config(config: &HandlerConfig) -> Self {
        if !config.ordered {
            return PathStrategy::Mirror;
        }
        match config.ordered_strategy {
            OrderedStrategy::Default => PathStrategy::Ordered,
            OrderedStrategy::Cmag => PathStrategy::Cmag,
            OrderedStrategy::Datorama => PathStrategy::Datorama,
            OrderedStrategy::Lotame => PathStrategy::Lotame,
            OrderedStrategy::Silverpop => PathStrategy::Silverpop,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PathStrategy::Mirror => "mirror",
            PathStrategy::Ordered => "ordered",
            PathStrategy::Cmag => "cmag",
            PathStrategy::Datorama => "datorama",
            PathStrategy::Lotame => "lotame",
            PathStrategy::Silverpop => "silverpop",
        }
    }

    /// Compute the destination path for `file`.
    pub fn output_path(&self, file: &InputFile, ctx: &RouteContext<'_>) -> Result<PathBuf> {
        let input = ctx.config.input.as_path();
        let pattern = ctx.config.ordered_time_pattern.as_str();
        let original = file.path();

        match self {
            PathStrategy::Mirror => Ok(ctx.output_dir.join(relative_path_of(original, input)?)),

            PathStrategy::Ordered => {
                let time = if ctx.config.ordered_by_processing_time {
                    ctx.processing_time
                } else {
                    file.modified()
                };
                let relative = relative_path_of(original, input)?;
                Ok(ctx
                    .output_dir
                    .join(daily_directory_for(
                        &top_level_of(original, input)?,
                        &format_time(time, pattern)?,
                    ))
                    .join(slug_for(ctx.processing_time, ctx.counter, &relative)))
            }

            PathStrategy::Cmag => {
                let time = timestamp::cmag_date(file.file_name()?)
                    .map_err(|e| routing_error(original, e))?;
                Ok(ctx
                    .output_dir
                    .join(daily_directory_for(
                        &top_level_of(original, input)?,
                        &format_time(time, pattern)?,
                    ))
                    .join(path_below_top_level(original, input)?))
            }

            PathStrategy::Datorama => {
                let relative = relative_path_of(original, input)?;
                Ok(ctx
                    .output_dir
                    .join(daily_directory_for(
                        &top_level_of(original, input)?,
                        &format_time(file.modified(), pattern)?,
                    ))
                    .join(file.modified().timestamp().to_string())
                    .join(slug_for(ctx.processing_time, ctx.counter, &relative)))
            }

            PathStrategy::Lotame => {
                let time =
                    timestamp::lotame_date(original).map_err(|e| routing_error(original, e))?;
                Ok(ctx
                    .output_dir
                    .join(format_time(time, pattern)?)
                    .join(file.file_name()?))
            }

            PathStrategy::Silverpop => {
                let time = timestamp::silverpop_date(file.file_name()?)
                    .map_err(|e| routing_error(original, e))?;
                Ok(ctx
                    .output_dir
                    .join(daily_directory_for(
                        &top_level_of(original, input)?,
                        &format_time(time, "%Y/%m")?,
                    ))
                    .join(path_below_top_level(original, input)?))
            }
        }
    }
}

fn routing_error(path: &Path, err: TimestampError) -> PrepError {
    PrepError::Routing {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
