use std::convert::Infallible;
use std::process::ExitCode;

use loophttp::{cli, Console, HttpRequest, HttpResponse, Os, StatusCode};

fn hello(request: HttpRequest, _os: &Os) -> Result<HttpResponse, Infallible> {
    Ok(HttpResponse::new(StatusCode::Ok)
        .with_version(request.version)
        .with_body_string("Hello world"))
}

fn main() -> ExitCode {
    env_logger::init();

    let console = cli::run(hello, std::env::args().skip(1), Console::stdio());
    ExitCode::from(console.exit_code())
}
