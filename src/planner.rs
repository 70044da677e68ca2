//! Output path planning.
//!
//! Every job writes exactly one file, whose location is derived from the source
//! path and the user's [`OutputOptions`]:
//!
//! ```text
//! both on    {dir}/with-watermark/{name}.watermark{ext}
//! suffix     {dir}/{name}.watermark{ext}
//! subfolder  {dir}/with-watermark/{name}{ext}
//! both off   {dir}/{name}{ext}            ← overwrites the source, needs staging
//! ```
//!
//! `{dir}` is the source's own directory, or the override directory when
//! `use_original_folder` is off and one is configured. The extension keeps its
//! original case.
//!
//! [`plan_output`] is pure. [`plan`] additionally creates the directory.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Child directory used when `use_subfolder` is on.
pub const SUBFOLDER: &str = "with-watermark";

/// Marker inserted between the file stem and extension when `append_suffix` is on.
pub const SUFFIX: &str = ".watermark";

/// The slice of settings the planner reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub use_original_folder: bool,
    /// Only honored when `use_original_folder` is false.
    pub override_directory: Option<PathBuf>,
    pub use_subfolder: bool,
    pub append_suffix: bool,
}

impl OutputOptions {
    /// True when the output would land on the source path itself.
    ///
    /// Without a suffix or subfolder the planned name equals the source name,
    /// so the source must be copied aside before it is overwritten.
    pub fn needs_staging(&self) -> bool {
        !self.append_suffix && !self.use_subfolder
    }
}

/// Where a job's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub directory: PathBuf,
    pub file_name: OsString,
    pub full_path: PathBuf,
}

/// Compute the output location without touching the filesystem.
pub fn plan_output(source: &Path, options: &OutputOptions) -> io::Result<OutputPlan> {
    let stem = source.file_stem().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", source.display()),
        )
    })?;

    let mut directory = match (&options.override_directory, options.use_original_folder) {
        (Some(dir), false) => dir.clone(),
        _ => source.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    if options.use_subfolder {
        directory.push(SUBFOLDER);
    }

    let mut file_name = stem.to_os_string();
    if options.append_suffix {
        file_name.push(SUFFIX);
    }
    if let Some(ext) = source.extension() {
        file_name.push(".");
        file_name.push(ext);
    }

    let full_path = directory.join(&file_name);
    Ok(OutputPlan {
        directory,
        file_name,
        full_path,
    })
}

/// Create `dir` and any missing parents. Succeeds if it already exists.
pub fn ensure_directory(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Compute the output location and make sure its directory exists.
pub fn plan(source: &Path, options: &OutputOptions) -> io::Result<OutputPlan> {
    let plan = plan_output(source, options)?;
    ensure_directory(&plan.directory)?;
    Ok(plan)
}
