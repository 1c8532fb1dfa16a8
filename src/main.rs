use log::*;

use singletrack::dispatcher::{self, DispatchConfig};
use singletrack::input;
use singletrack::output::{Fanout, JsonSink, TextSink};
use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "singletrack", about = "Single-track crossing dispatcher.")]
struct Opt {
    /// Train file, one `<direction> <load> <cross>` record per line.
    #[structopt(name = "FILE")]
    #[structopt(parse(from_os_str))]
    file: PathBuf,

    /// Where to write the event log.
    #[structopt(short, long, default_value = "output.txt")]
    #[structopt(parse(from_os_str))]
    output: PathBuf,

    /// Also write the events as JSON lines to this file.
    #[structopt(long)]
    #[structopt(parse(from_os_str))]
    json: Option<PathBuf>,

    /// Wall time of one input tick, in milliseconds.
    #[structopt(long, default_value = "100")]
    tick_ms: u64,

    /// Give up when a train stays on the crossing for this many seconds.
    #[structopt(long)]
    deadline_secs: Option<u64>,

    /// Activate debug mode
    #[structopt(short, long)]
    verbose: bool,
}

fn main() {
    let _h1 = hprof::enter("init");

    let opt = Opt::from_args();
    let level = if opt.verbose {
        if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    } else {
        LevelFilter::Error
    };
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("could not set up logging: {}", e);
    }
    info!("{:#?}", opt);
    drop(_h1);

    if let Err(e) = dispatch(&opt) {
        error!("{}", e);
        std::process::exit(1);
    }

    hprof::end_frame();
    if opt.verbose {
        hprof::profiler().print_timing();
    }
}

fn dispatch(opt: &Opt) -> Result<(), Box<dyn std::error::Error>> {
    let trains = {
        let _h = hprof::enter("read file");
        input::read_trains(&opt.file)?
    };

    let mut sink = Fanout::new().with(TextSink::create(&opt.output)?);
    if let Some(f) = &opt.json {
        sink = sink.with(JsonSink::create(f)?);
    }

    let config = DispatchConfig {
        tick: Duration::from_millis(opt.tick_ms),
        deadline: opt.deadline_secs.map(Duration::from_secs),
        ..Default::default()
    };

    let summary = {
        let _h = hprof::enter("dispatch");
        let (summary, _sink) = dispatcher::run(&trains, sink, &config)?;
        summary
    };

    info!("Wrote {} events to {}", 3 * summary.crossed(), opt.output.display());
    if let Some(f) = &opt.json {
        info!("Wrote JSON events to {}", f.display());
    }
    Ok(())
}
