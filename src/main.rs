use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use tv_view::controller::{Args, Controller, OutputFormat};
use tv_view::{TVError, TableView, logging, ui};

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);
    match run(args) {
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), TVError> {
    let controller = Controller::new(args);
    let source = controller.source()?;
    let records = source.fetch()?;
    info!("Starting tv on {} ...", source.describe());

    let columns = controller.columns(&records);
    let mut view = TableView::new(controller.config(), columns)?;
    view.load(records);

    for message in controller.messages() {
        view.update(message);
    }

    if controller.args().all_pages {
        let last = i64::try_from(view.total_pages()).unwrap_or(i64::MAX);
        for page in 1..=last {
            view.set_page(page);
            print_page(&view, controller.args().format)?;
        }
    } else {
        print_page(&view, controller.args().format)?;
    }

    Ok(())
}

fn print_page(view: &TableView, format: OutputFormat) -> Result<(), TVError> {
    match format {
        OutputFormat::Table => println!("{}\n", ui::render_table(view)),
        OutputFormat::Json => println!("{}", ui::render_json(view)?),
    }
    Ok(())
}
