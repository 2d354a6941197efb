use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use ve_formats::document::EVENT_FILE_SUFFIX;
use ve_formats::EventDocument;
use walkdir::WalkDir;

use crate::cli::{BatchArgs, PrintArgs};
use crate::report::{EventReport, TranslationReport};
use crate::script::{to_script, Script};

pub fn is_event_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(EVENT_FILE_SUFFIX))
}

/// Expands directories into the event files below them, sorted by path.
/// Files named directly are kept whatever their suffix.
pub fn collect_event_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let before = files.len();
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry = entry.with_context(|| format!("walking {}", input.display()))?;
                if entry.file_type().is_file() && is_event_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            if files.len() == before {
                warn!("No {EVENT_FILE_SUFFIX} files under {}", input.display());
            }
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            bail!("input {} does not exist", input.display());
        }
    }
    Ok(files)
}

pub fn translate_file(path: &Path) -> Result<(EventDocument, Script)> {
    let document = EventDocument::from_path(path)?;
    let script = to_script(&document)
        .with_context(|| format!("generating Python for {}", path.display()))?;
    Ok((document, script))
}

pub fn run_print(args: &PrintArgs) -> Result<()> {
    let (document, script) = translate_file(&args.input)?;
    print!("{}", script.text());
    if let Some(path) = &args.json_report {
        let mut report = TranslationReport::default();
        report.push(EventReport::translated(&args.input, &document, &script, None));
        report.write_json(path)?;
    }
    Ok(())
}

/// Translates every collected event into `<output dir>/<event name>.py`.
///
/// Without `keep_going` the first failing event aborts the run; with it the
/// failure is recorded in the returned report.
pub fn run_batch(args: &BatchArgs) -> Result<TranslationReport> {
    let files = collect_event_files(&args.inputs)?;
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating output directory {}", args.output_dir.display()))?;

    let mut report = TranslationReport::default();
    let mut written: BTreeMap<String, PathBuf> = BTreeMap::new();
    for file in &files {
        match write_event(file, &args.output_dir, &mut written) {
            Ok(event) => report.push(event),
            Err(err) if args.keep_going => {
                error!("{err:#}");
                report.push(EventReport::failed(file, &err));
            }
            Err(err) => return Err(err),
        }
    }

    if let Some(path) = &args.json_report {
        report.write_json(path)?;
    }
    Ok(report)
}

fn write_event(
    file: &Path,
    output_dir: &Path,
    written: &mut BTreeMap<String, PathBuf>,
) -> Result<EventReport> {
    let (document, script) = translate_file(file)?;
    if let Some(previous) = written.get(&script.event_name) {
        bail!(
            "{} and {} both translate to event {}",
            previous.display(),
            file.display(),
            script.event_name
        );
    }

    let output = output_dir.join(format!("{}.py", script.event_name));
    fs::write(&output, script.text())
        .with_context(|| format!("writing {}", output.display()))?;
    info!("Wrote {}", output.display());
    written.insert(script.event_name.clone(), file.to_path_buf());
    Ok(EventReport::translated(file, &document, &script, Some(output)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_expand_to_sorted_event_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("Beach");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("Walk.ve.xml"), "").unwrap();
        fs::write(dir.path().join("Intro.ve.xml"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("Other.xml"), "").unwrap();

        let files = collect_event_files(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(
            files,
            vec![nested.join("Walk.ve.xml"), dir.path().join("Intro.ve.xml")]
        );
    }

    #[test]
    fn missing_inputs_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_event_files(&[dir.path().join("absent.ve.xml")]).is_err());
    }

    #[test]
    fn event_file_suffix() {
        assert!(is_event_file(Path::new("a/b/Walk.ve.xml")));
        assert!(!is_event_file(Path::new("a/b/Walk.xml")));
    }
}
