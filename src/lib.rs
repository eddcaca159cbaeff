// Library root
// -----------
// This crate exposes the library surface behind the `gscli` binary.
//
// Module responsibilities:
// - `api`: HTTP client for the course platform (login, scraping, upload,
//   status polling).
// - `platform`: the `Platform` / `Connector` traits the core is written
//   against, plus the status payload model.
// - `session`, `connection`: cookie cache and restore-or-login.
// - `files`: turns file/directory arguments into open files.
// - `submit`: upload orchestration and the result polling loop.
// - `report`: autograder results and their text rendering.
// - `assignment`: the per-directory current assignment.
// - `commands`, `ui`, `cli`: user-facing commands, prompts and arguments.
// - `config`, `error`: environment configuration and adapter errors.
pub mod api;
pub mod assignment;
pub mod cli;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod files;
pub mod platform;
pub mod report;
pub mod session;
pub mod submit;
pub mod ui;

#[cfg(test)]
mod testing;
