use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use powerlaw::core::constants::{DEFAULT_EXCHANGE_RATE, DEFAULT_INFLATION_RATE, DEFAULT_TAX_RATE};
use powerlaw::core::{
    AccumulationForm, AccumulationRow, DrawdownSummary, FieldErrors, InitialHoldingKind,
    PhaseLabel, PriceModel, SimulationOutcome, WithdrawalForm, WithdrawalMode, WithdrawalRow,
    assess_position, days_since_genesis, format_percentage, model_output, run_accumulation,
    run_drawdown,
};

#[derive(Parser, Debug)]
#[command(
    name = "powerlaw",
    about = "Power-law valuation model with accumulation and drawdown projections"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the JSON HTTP API.
    Serve {
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
    /// Print the model values for a date (today by default).
    Model {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Compare a USD price against the model.
    Position {
        #[arg(long)]
        price: f64,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Accumulate(AccumulateArgs),
    Drawdown(DrawdownArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPriceModel {
    Standard,
    Conservative,
}

impl From<CliPriceModel> for PriceModel {
    fn from(value: CliPriceModel) -> Self {
        match value {
            CliPriceModel::Standard => PriceModel::Standard,
            CliPriceModel::Conservative => PriceModel::Conservative,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliHoldingKind {
    Fiat,
    Coin,
}

impl From<CliHoldingKind> for InitialHoldingKind {
    fn from(value: CliHoldingKind) -> Self {
        match value {
            CliHoldingKind::Fiat => InitialHoldingKind::Fiat,
            CliHoldingKind::Coin => InitialHoldingKind::Coin,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliWithdrawalMode {
    Fixed,
    Percentage,
}

impl From<CliWithdrawalMode> for WithdrawalMode {
    fn from(value: CliWithdrawalMode) -> Self {
        match value {
            CliWithdrawalMode::Fixed => WithdrawalMode::Fixed,
            CliWithdrawalMode::Percentage => WithdrawalMode::Percentage,
        }
    }
}

/// Project holdings under a monthly purchase plan.
#[derive(Args, Debug)]
struct AccumulateArgs {
    #[arg(long, value_enum, default_value_t = CliHoldingKind::Coin)]
    initial_kind: CliHoldingKind,
    #[arg(long, default_value = "0", help = "Initial coins, or fiat with --initial-kind fiat")]
    initial: String,
    #[arg(long, default_value = "0")]
    monthly: String,
    #[arg(long)]
    years: String,
    #[arg(long, value_enum, default_value_t = CliPriceModel::Standard)]
    model: CliPriceModel,
    #[arg(long, default_value_t = DEFAULT_EXCHANGE_RATE.to_string())]
    exchange_rate: String,
    #[arg(long, default_value_t = DEFAULT_INFLATION_RATE.to_string(), help = "Annual inflation in percent")]
    inflation_rate: String,
}

impl AccumulateArgs {
    fn into_form(self) -> AccumulationForm {
        let kind: InitialHoldingKind = self.initial_kind.into();
        let (initial_fiat_amount, initial_btc_holding) = match kind {
            InitialHoldingKind::Fiat => (self.initial, String::new()),
            InitialHoldingKind::Coin => (String::new(), self.initial),
        };
        AccumulationForm {
            initial_holding_kind: kind,
            initial_fiat_amount,
            initial_btc_holding,
            monthly_contribution: self.monthly,
            years: self.years,
            price_model: Some(self.model.into()),
            exchange_rate: self.exchange_rate,
            inflation_rate: self.inflation_rate,
        }
    }
}

/// Project a withdrawal plan until the horizon.
#[derive(Args, Debug)]
struct DrawdownArgs {
    #[arg(long)]
    initial_btc: String,
    #[arg(long, help = "First withdrawal year; defaults to the current year")]
    start_year: Option<String>,
    #[arg(long, value_enum, default_value_t = CliPriceModel::Standard)]
    model: CliPriceModel,
    #[arg(long, value_enum, default_value_t = CliWithdrawalMode::Fixed)]
    mode: CliWithdrawalMode,
    #[arg(long, default_value = "", help = "Monthly after-tax fiat amount")]
    amount: String,
    #[arg(long, default_value = "", help = "Annual percentage of the balance")]
    rate: String,
    #[arg(long, help = "Enables a second phase starting in this year")]
    second_phase_year: Option<String>,
    #[arg(long, value_enum, default_value_t = CliWithdrawalMode::Fixed)]
    second_phase_mode: CliWithdrawalMode,
    #[arg(long, default_value = "")]
    second_phase_amount: String,
    #[arg(long, default_value = "")]
    second_phase_rate: String,
    #[arg(long, default_value_t = DEFAULT_TAX_RATE.to_string())]
    tax_rate: String,
    #[arg(long, default_value_t = DEFAULT_EXCHANGE_RATE.to_string())]
    exchange_rate: String,
    #[arg(long, default_value_t = DEFAULT_INFLATION_RATE.to_string())]
    inflation_rate: String,
}

impl DrawdownArgs {
    fn into_form(self, base_year: i32) -> WithdrawalForm {
        WithdrawalForm {
            initial_btc: self.initial_btc,
            start_year: self.start_year.unwrap_or_else(|| base_year.to_string()),
            price_model: Some(self.model.into()),
            withdrawal_mode: self.mode.into(),
            withdrawal_amount: self.amount,
            withdrawal_rate: self.rate,
            second_phase_enabled: self.second_phase_year.is_some(),
            second_phase_start_year: self.second_phase_year.unwrap_or_default(),
            second_phase_mode: self.second_phase_mode.into(),
            second_phase_amount: self.second_phase_amount,
            second_phase_rate: self.second_phase_rate,
            tax_rate: self.tax_rate,
            exchange_rate: self.exchange_rate,
            inflation_rate: self.inflation_rate,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("powerlaw=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let today = Local::now().date_naive();
    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = powerlaw::api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Model { date } => print_model(date.unwrap_or(today)),
        Command::Position { price, date } => print_position(price, date.unwrap_or(today)),
        Command::Accumulate(args) => {
            let outcome = run_accumulation(&args.into_form(), today.year());
            exit_on_errors(&outcome);
            print_accumulation(&outcome.rows);
        }
        Command::Drawdown(args) => {
            let outcome = run_drawdown(&args.into_form(today.year()), today.year());
            exit_on_errors(&outcome);
            print_drawdown(&outcome.rows, DrawdownSummary::from_rows(&outcome.rows, today.year()));
        }
    }
}

fn exit_on_errors<R>(outcome: &SimulationOutcome<R>) {
    if outcome.is_success() {
        return;
    }
    print_field_errors(&outcome.errors);
    std::process::exit(2);
}

fn print_field_errors(errors: &FieldErrors) {
    for (field, message) in errors {
        eprintln!("{field}: {message}");
    }
}

fn print_model(date: NaiveDate) {
    let days = days_since_genesis(date);
    let model = model_output(days);
    println!("Date:               {date}");
    println!("Days since genesis: {days}");
    println!("Median (USD):       {:.2}", model.median_usd);
    println!("Support (USD):      {:.2}", model.support_usd);
}

fn print_position(price: f64, date: NaiveDate) {
    let days = days_since_genesis(date);
    let model = model_output(days);
    let metric = assess_position(price, model);
    println!("Date:               {date}");
    println!("Price (USD):        {price:.2}");
    println!("Median (USD):       {:.2}", model.median_usd);
    println!("Support (USD):      {:.2}", model.support_usd);
    println!(
        "Vs median:          {}",
        format_percentage(metric.relative_position_pct, 1)
    );
    println!(
        "Vs support:         {}",
        format_percentage(metric.support_deviation_pct, 1)
    );
    println!("Position:           {} ({})", metric.label, metric.color);
}

fn print_accumulation(rows: &[AccumulationRow]) {
    println!(
        "{:>6} {:>18} {:>16} {:>14} {:>14} {:>20}",
        "Year", "Price", "Contribution", "Purchased", "Held", "Value"
    );
    for row in rows {
        let marker = if row.is_contribution_period { "*" } else { "" };
        println!(
            "{:>6} {:>18.0} {:>16.0} {:>14.8} {:>14.8} {:>20.0} {marker}",
            row.year,
            row.btc_price_fiat,
            row.annual_contribution_fiat,
            row.btc_purchased,
            row.cumulative_btc_held,
            row.total_value_fiat,
        );
    }
}

fn print_drawdown(rows: &[WithdrawalRow], summary: DrawdownSummary) {
    println!(
        "{:>6} {:>7} {:>18} {:>9} {:>16} {:>14} {:>14} {:>20}",
        "Year", "Phase", "Price", "Rate", "Withdrawal", "Sold", "Remaining", "Value"
    );
    for row in rows {
        let phase = match row.phase_label {
            PhaseLabel::First => "1",
            PhaseLabel::Second => "2",
        };
        let rate = row
            .effective_rate
            .map_or_else(|| "-".to_string(), |r| format!("{r:.2}%"));
        println!(
            "{:>6} {:>7} {:>18.0} {:>9} {:>16.0} {:>14.8} {:>14.8} {:>20.0}",
            row.year,
            phase,
            row.btc_price_fiat,
            rate,
            row.withdrawal_fiat,
            row.withdrawal_btc,
            row.remaining_btc,
            row.total_value_fiat,
        );
    }
    match (summary.depletion_year, summary.years_lasted) {
        (Some(year), Some(lasted)) => println!("Depleted in {year} after {lasted} full year(s)"),
        _ => println!("Holdings last through the horizon"),
    }
    if let Some(value) = summary.value_after_five_years {
        println!("Value after five years: {value:.0}");
    }
}
