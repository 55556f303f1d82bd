// src/main.rs

use stagedag::errors::EXIT_SUCCESS;
use stagedag::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("stagedag error: {err:?}");
        std::process::exit(stagedag::errors::EXIT_INTERNAL_ERROR);
    }

    let code = match run(args).await {
        Ok(()) => EXIT_SUCCESS,
        Err(err) => {
            eprintln!("stagedag error: {err}");
            err.exit_code()
        }
    };
    std::process::exit(code);
}
