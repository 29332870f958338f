use std::env;
use std::process;

use log::{error, info};

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let input = args.next().unwrap_or_else(|| "light_model.fmb".to_string());
    let output = args.next().unwrap_or_else(|| "model.h".to_string());

    match headergen::generate(&input, &output, headergen::DEFAULT_ARRAY_NAME) {
        Ok(n) => info!("embedded {n} bytes from {input} into {output}"),
        Err(e) => {
            error!("failed to generate {output} from {input}: {e}");
            process::exit(1);
        }
    }
}
