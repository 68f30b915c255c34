use std::{
    env,
    fs::File,
    io,
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use wallet_ledger::{
    bank::Bank, clock::SystemClock, config::Config, delivery::Inbox,
    dlq::TracingDeadLetterQueue, ingestion::CsvReader, logging, processor::BatchProcessor,
    report::BalanceReport,
};

#[tokio::main] // using Tokio runtime for async
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);

    let Some(file_path) = args.next() else {
        eprintln!("usage: wallet_ledger <operations.csv> [config.json]");
        process::exit(2);
    };
    let config_path = args.next().map(PathBuf::from);

    let config = Config::load(config_path.as_deref())?;
    logging::init_logger(&config.log_level)?;

    let file = File::open(Path::new(&file_path))?;
    let ingestion = CsvReader::new(file)?;

    // Set up the components
    let bank = Bank::bootstrap(config, Arc::new(Inbox::new()), Arc::new(SystemClock))?;
    let mut processor = BatchProcessor::new(ingestion, bank, TracingDeadLetterQueue::default());

    processor.process().await?;

    let report = BalanceReport::collect(processor.bank()).await?;
    report.write_to(io::stdout().lock())?;

    Ok(())
}
