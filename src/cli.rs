// Command-line surface: argument definitions and dispatch to `commands`.

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, Context, SubmitArgs};
use crate::config::Config;
use crate::ui::{self, InteractiveConnector};

#[derive(Parser, Debug)]
#[command(name = "gscli", version)]
#[command(about = "Submit coursework and check autograder results from the terminal.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Upload files and wait for the autograder
    Submit {
        /// Files or directories to submit (default: current directory)
        files: Vec<String>,
        /// Course id (default: current assignment)
        #[arg(short, long)]
        course: Option<String>,
        /// Assignment id (default: current assignment)
        #[arg(short, long)]
        assignment: Option<String>,
        /// Leaderboard name, for assignments that require one
        #[arg(short = 'n', long)]
        leaderboard: Option<String>,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },
    /// Join a course (not supported yet)
    Join {
        /// Course id
        course_id: String,
    },
    /// List courses and their assignments
    List {
        /// Include courses from every term
        #[arg(short, long)]
        all: bool,
        /// Only list courses
        #[arg(short, long)]
        courses: bool,
    },
    /// Show results of the latest submission
    Status {
        /// Course id (default: current assignment)
        course: Option<String>,
        /// Assignment id (default: current assignment)
        assignment: Option<String>,
    },
    /// Pick the current course and assignment for this directory
    Choose,
    /// Forget the cached login
    Logout,
    /// Forget the cached login and the current assignment
    Clean,
}

/// Run one parsed invocation against the real platform.
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;
    let ctx = Context::new(config, std::env::current_dir()?);
    let mut connector = InteractiveConnector;
    let mut out = io::stdout();

    match cli.command {
        None => commands::report_current_assignment(&ctx, &mut out),
        Some(Commands::Submit {
            files,
            course,
            assignment,
            leaderboard,
            recursive,
        }) => {
            let args = SubmitArgs {
                files,
                course,
                assignment,
                leaderboard,
                recursive,
            };
            commands::submit(&ctx, &mut connector, args, &ui::spinner(), &mut out)
        }
        Some(Commands::Join { course_id }) => commands::join(&course_id, &mut out),
        Some(Commands::List { all, courses }) => {
            commands::list(&ctx, &mut connector, all, courses, &mut out)
        }
        Some(Commands::Status { course, assignment }) => commands::status(
            &ctx,
            &mut connector,
            course,
            assignment,
            &ui::spinner(),
            &mut out,
        ),
        Some(Commands::Choose) => commands::choose(&ctx, &mut connector, ui::select, &mut out),
        Some(Commands::Logout) => commands::logout(&ctx, &mut out),
        Some(Commands::Clean) => commands::clean(&ctx, &mut out),
    }
}
