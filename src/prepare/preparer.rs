use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use log::{debug, error, info};
use walkdir::WalkDir;

use crate::error::{MigrateError, Result};
use crate::migrate::ident::{ObjectKind, BODY_SUFFIX};
use crate::prepare::template::render_content;

/// Suffix of the source trees holding parameterized SQL, e.g.
/// `packages.install/` publishing into `packages/`.
pub const INSTALL_SUFFIX: &str = ".install";

/// One discovered source file and the path its rendered copy goes to.
#[derive(Debug)]
pub struct SourceFile {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Renders `.install` trees into their installable directories, replacing
/// parameter tokens along the way. Rendering never executes anything.
#[derive(Debug)]
pub struct Preparer {
    roots: Vec<PathBuf>,
    scope: HashMap<String, String>,
}

impl Preparer {
    pub fn new(roots: Vec<PathBuf>, scope: HashMap<String, String>) -> Result<Self> {
        if roots.is_empty() {
            return Err(MigrateError::Config(
                "at least one migration path must be configured".to_string(),
            ));
        }
        Ok(Preparer { roots, scope })
    }

    /// Walks every `<kind>.install` tree under the configured roots and
    /// pairs each `.sql` file with its mirrored publish path. Walking
    /// order within a directory is whatever the filesystem yields.
    pub fn discover(&self) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();

        for root in &self.roots {
            for kind in ObjectKind::ALL {
                let install_dir = root.join(format!("{}{}", kind.directory(), INSTALL_SUFFIX));
                if !install_dir.is_dir() {
                    continue;
                }
                let target_dir = root.join(kind.directory());

                for entry in WalkDir::new(&install_dir) {
                    let entry = entry.map_err(|err| MigrateError::Io(err.into()))?;
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    if entry.path().extension().and_then(|ext| ext.to_str()) != Some("sql") {
                        continue;
                    }
                    let relative = entry
                        .path()
                        .strip_prefix(&install_dir)
                        .expect("walked entries stay under their root");
                    files.push(SourceFile {
                        source: entry.path().to_path_buf(),
                        target: target_dir.join(relative),
                    });
                }
            }
        }

        Ok(files)
    }

    /// Object names worth announcing. Body files ride along with their
    /// specification, so they are left off the listing.
    pub fn listed_names(files: &[SourceFile]) -> Vec<String> {
        files
            .iter()
            .filter_map(|file| {
                let stem = file.source.file_stem().and_then(|stem| stem.to_str())?;
                if stem.to_uppercase().ends_with(BODY_SUFFIX) {
                    None
                } else {
                    Some(stem.to_string())
                }
            })
            .collect()
    }

    fn prepare_file(&self, file: &SourceFile) -> Result<()> {
        let content = fs::read_to_string(&file.source)?;
        let rendered = render_content(&content, &self.scope);

        if let Some(parent) = file.target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file.target, rendered)?;

        debug!("Prepared {} -> {}", file.source.display(), file.target.display());
        Ok(())
    }

    /// Renders everything `discover` found. With `dry_run` the listing is
    /// printed and nothing is written. Returns the number of files
    /// written; a partial failure finishes the batch before reporting.
    pub fn run(&self, dry_run: bool) -> Result<usize> {
        let files = self.discover()?;
        if files.is_empty() {
            info!("No .install sources found to prepare");
            return Ok(0);
        }

        info!("Total {} file(s) to be prepared:", files.len());
        for name in Self::listed_names(&files) {
            info!("\t{}", name);
        }
        if dry_run {
            return Ok(0);
        }

        let total = files.len();
        let mut failed = 0;
        for file in &files {
            if let Err(err) = self.prepare_file(file) {
                error!("Failed to prepare {}: {}", file.source.display(), err);
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(MigrateError::Batch { failed, total });
        }

        info!("Sources prepared successfully");
        Ok(total)
    }
}
