use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Translates HHS+ visual events (.ve.xml) into Python scripts",
    version
)]
pub struct Args {
    /// Event files, or directories searched recursively for *.ve.xml files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory to write one <event name>.py per translated event
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Path to write the translation report as JSON
    #[arg(long)]
    pub json_report: Option<PathBuf>,

    /// Record failed events in the report and carry on (requires --output-dir)
    #[arg(long)]
    pub keep_going: bool,

    /// Log every parse and generation step
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Translate a single event and print the script to stdout.
    Print(PrintArgs),
    Batch(BatchArgs),
}

#[derive(Debug, PartialEq, Eq)]
pub struct PrintArgs {
    pub input: PathBuf,
    pub json_report: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct BatchArgs {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub json_report: Option<PathBuf>,
    pub keep_going: bool,
}

impl Args {
    pub fn into_command(self) -> Result<Command> {
        let Some(output_dir) = self.output_dir else {
            if self.keep_going {
                bail!("--keep-going requires --output-dir");
            }
            let mut inputs = self.inputs;
            if inputs.len() != 1 || inputs[0].is_dir() {
                bail!("translating more than one event requires --output-dir");
            }
            return Ok(Command::Print(PrintArgs {
                input: inputs.remove(0),
                json_report: self.json_report,
            }));
        };

        Ok(Command::Batch(BatchArgs {
            inputs: self.inputs,
            output_dir,
            json_report: self.json_report,
            keep_going: self.keep_going,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Command> {
        let args = Args::try_parse_from(std::iter::once("event2py").chain(argv.iter().copied()))?;
        args.into_command()
    }

    #[test]
    fn single_file_prints() {
        let command = parse(&["Events/BeachWalk.ve.xml", "--json-report", "r.json"]).unwrap();
        assert_eq!(
            command,
            Command::Print(PrintArgs {
                input: PathBuf::from("Events/BeachWalk.ve.xml"),
                json_report: Some(PathBuf::from("r.json")),
            })
        );
    }

    #[test]
    fn batch_needs_output_dir() {
        assert!(parse(&["A.ve.xml", "B.ve.xml"]).is_err());
        assert!(parse(&["A.ve.xml", "--keep-going"]).is_err());
        assert!(parse(&[]).is_err());

        let dir = tempfile::tempdir().unwrap();
        let dir_arg = dir.path().to_str().unwrap();
        assert!(parse(&[dir_arg]).is_err());

        let command = parse(&[dir_arg, "B.ve.xml", "--output-dir", "out", "--keep-going"]).unwrap();
        assert_eq!(
            command,
            Command::Batch(BatchArgs {
                inputs: vec![PathBuf::from(dir_arg), PathBuf::from("B.ve.xml")],
                output_dir: PathBuf::from("out"),
                json_report: None,
                keep_going: true,
            })
        );
    }
}
