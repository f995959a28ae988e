//! The `serve` command.

use log::warn;
use thiserror::Error;

use crate::server::{Console, Handler, HttpServer, ListenAddr, Nothing, ServerConfig};

/// Port used when `--port` is missing or not a valid port number.
pub const DEFAULT_PORT: u16 = 8080;

pub const USAGE: &str = "\
serve --port= --no-output --allow-anyone

Start an HTTP server

--port is the port on which to expose the server (default: 8080)
--no-output to suppress the diagnostic messages
--allow-anyone to accept connections coming from outside the machine (default: only local connections are allowed)
";

/// Errors in the command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Missing command")]
    MissingCommand,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Serve(ServeOptions),
    Help,
}

/// Options of the `serve` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    pub port: u16,
    pub no_output: bool,
    pub allow_anyone: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            no_output: false,
            allow_anyone: false,
        }
    }
}

impl ServeOptions {
    /// The server configuration these options describe.
    pub fn config(&self) -> ServerConfig {
        let listener = if self.allow_anyone {
            ListenAddr::anyone(self.port)
        } else {
            ListenAddr::new(self.port)
        };
        ServerConfig::listening_on([listener])
    }
}

/// Parse the arguments following the program name.
pub fn parse<I, S>(args: I) -> Result<Command, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut args = args.into_iter();
    let command = args.next().ok_or(Error::MissingCommand)?;
    match command.as_ref() {
        "serve" => {}
        "help" | "--help" | "-h" => return Ok(Command::Help),
        other => return Err(Error::UnknownCommand(other.to_string())),
    }

    let mut options = ServeOptions::default();
    for arg in args {
        let arg = arg.as_ref();
        match arg.split_once('=') {
            Some(("--port", value)) => options.port = parse_port(value),
            None if arg == "--no-output" => options.no_output = true,
            None if arg == "--allow-anyone" => options.allow_anyone = true,
            None if arg == "--help" || arg == "-h" => return Ok(Command::Help),
            _ => return Err(Error::UnknownOption(arg.to_string())),
        }
    }

    Ok(Command::Serve(options))
}

fn parse_port(value: &str) -> u16 {
    value.parse().unwrap_or_else(|_| {
        warn!("Invalid port {value:?}, using {DEFAULT_PORT}");
        DEFAULT_PORT
    })
}

/// Run the command line with `handler` serving the requests.
///
/// Blocks until the server is interrupted with Ctrl+C.
pub fn run<H, I, S>(handler: H, args: I, console: Console) -> Console
where
    H: Handler,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    match parse(args) {
        Ok(Command::Help) => console.output(USAGE),
        Ok(Command::Serve(options)) => {
            let server = HttpServer::new(options.config(), handler);
            let server = if options.no_output {
                server.with_output(Nothing)
            } else {
                server
            };
            server.run(console)
        }
        Err(e) => console.exit(1).error(&format!("{e}\n\n{USAGE}")),
    }
}
