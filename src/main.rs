use bot_trainer::cli;
use bot_trainer::configuration::Configuration;
use bot_trainer::session::SessionDriver;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let plan = cli::parse(&args)?;

    let config = Configuration::from_env();
    let mut driver = SessionDriver::new(config);
    let totals = driver.run(&plan)?;

    println!("Final score: {totals}");
    Ok(())
}
