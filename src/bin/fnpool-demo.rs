#[macro_use]
extern crate log;
#[macro_use]
extern crate clap;

use fnpool::*;
use log::LevelFilter;
use serde::Serialize;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

arg_enum! {
#[allow(non_camel_case_types)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Format {
    plain,
    json
}
}

#[derive(StructOpt, Debug)]
#[structopt(name = "fnpool-demo")]
struct Opt {
    #[structopt(
        long,
        short = "w",
        help = "Sets the number of worker threads",
        value_name = "N"
    )]
    workers: Option<usize>,
    #[structopt(
        long,
        help = "Sets how many parameter sets are submitted",
        value_name = "N",
        default_value = "20"
    )]
    count: u64,
    #[structopt(
        long = "delay-ms",
        help = "Sets how long each call sleeps before printing",
        value_name = "MILLIS",
        default_value = "1000"
    )]
    delay_ms: u64,
    #[structopt(
        long,
        help = "Reads pool settings from a JSON file",
        value_name = "FILE",
        parse(from_os_str)
    )]
    config: Option<PathBuf>,
    #[structopt(
        long,
        help = "Sets how each result is printed",
        value_name = "FORMAT",
        default_value = "plain",
        raw(possible_values = "&Format::variants()")
    )]
    format: Format,
}

#[derive(Debug, Clone, Copy)]
struct Params {
    x: u64,
    y: u64,
}

#[derive(Serialize)]
struct Output {
    x: u64,
    y: u64,
    value: u64,
}

fn sum_of_squares(p: &Params) -> Option<u64> {
    p.x.checked_mul(p.x)?.checked_add(p.y.checked_mul(p.y)?)
}

fn run(opt: Opt) -> Result<()> {
    let mut config = match opt.config {
        Some(ref path) => PoolConfig::load(path)?,
        None => PoolConfig::default(),
    };
    if opt.workers.is_some() {
        config.workers = opt.workers;
    }

    let sink: Arc<dyn Sink> = Arc::new(WriterSink::stdout());
    let delay = Duration::from_millis(opt.delay_ms);
    let format = opt.format;

    let pool = Builder::from_config(
        move |p: &Params| {
            thread::sleep(delay);
            let value = match sum_of_squares(p) {
                Some(value) => value,
                None => {
                    error!("x*x + y*y overflows for {:?}", p);
                    return;
                }
            };
            let line = match format {
                Format::plain => value.to_string(),
                Format::json => match serde_json::to_string(&Output { x: p.x, y: p.y, value }) {
                    Ok(line) => line,
                    Err(e) => {
                        error!("cannot encode result for {:?}: {}", p, e);
                        return;
                    }
                },
            };
            if let Err(e) = sink.write_line(&line) {
                error!("cannot write result: {}", e);
            }
        },
        config,
    )
    .build()?;

    info!("fnpool-demo {}", env!("CARGO_PKG_VERSION"));
    info!("Output format: {}", format);
    info!("Running {} calls on {} workers", opt.count, pool.worker_count());

    for x in 1..=opt.count {
        match x.checked_add(1) {
            Some(y) => pool.submit(Params { x, y }),
            None => warn!("skipping x = {}: y would overflow", x),
        }
    }
    pool.wait();
    Ok(())
}

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();
    let opt = Opt::from_args();
    if let Err(e) = run(opt) {
        error!("{}", e);
        exit(1);
    }
}
