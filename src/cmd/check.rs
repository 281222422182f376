//! A subcommand making sure the configuration is valid, Dgraph is reachable
//! and has the expected schema installed. Does not change anything.

use crate::{
    args::{Args, Shared},
    config::Config,
    db::Client,
    load_config_and_init_logger,
    prelude::*,
    schema::{SchemaState, Synchronizer},
};


pub(crate) async fn run(shared: &Shared, args: &Args) -> Result<()> {
    let config = load_config_and_init_logger(shared, args, "check")
        .context("failed to load config: cannot proceed with `check` command")?;

    info!("Starting to verify various things...");
    let log_file = check_log_file(&config);
    let client = Client::new(&config.db);
    let schema = match &client {
        Ok(client) => check_schema(client, &config).await,
        Err(_) => Err(anyhow!("skipped: no Dgraph client")),
    };
    info!("Done verifying various things");


    // Print summary after all log output
    let mut any_errors = false;
    println!();
    bunt::println!("{$bold+blue+intense}Summary{/$}");
    println!();
    print_outcome(&mut any_errors, "Load configuration", &Ok(()));
    print_outcome(&mut any_errors, "Open log file", &log_file);
    print_outcome(&mut any_errors, "Create Dgraph client", &client);
    print_outcome(&mut any_errors, "Installed schema", &schema);

    println!();
    if any_errors {
        bunt::println!("{$red+intense}➡  Errors have occured!{/$}");
        std::process::exit(1);
    } else {
        bunt::println!("{$green+intense}⮕  Everything OK{/$}");
        Ok(())
    }
}

fn print_outcome<T>(any_errors: &mut bool, label: &str, result: &Result<T>) {
    match result {
        Ok(_) => {
            bunt::println!(" ▸ {[bold+intense]}  {$green+bold}✔ ok{/$}", label);
        }
        Err(e) => {
            *any_errors = true;
            bunt::println!(" ▸ {[bold+intense]}  {$red+bold}✘ error{/$}", label);
            bunt::println!("      {$red}▶▶▶ {$bold}Error:{/$}{/$} {[yellow+intense]}", e);
            if e.chain().len() > 1 {
                println!();
                bunt::println!("      {$red+italic}Caused by:{/$}");
            }

            for (i, cause) in e.chain().skip(1).enumerate() {
                print!("       {: >1$}", "", i * 2);
                println!("‣ {cause}");
            }
            println!();
        }
    }
}

fn check_log_file(config: &Config) -> Result<()> {
    // The logger already created the file, so this only fails if it was
    // removed in the meantime.
    if let Some(path) = &config.log.file {
        let path = path.to_string_lossy().replace("${cmd}", "check");
        debug!("Trying to open '{path}' for appending...");
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .with_context(|| format!("could not open '{path}' for appending"))?;
    }

    Ok(())
}

async fn check_schema(client: &Client, config: &Config) -> Result<()> {
    if !client.host().is_https() {
        warn!("Dgraph is accessed via unencrypted HTTP ({})", client.host());
    }

    let sync = Synchronizer::new(client.clone());
    let state = sync.status(&config.schema.deadline())
        .await
        .with_context(|| format!("failed to retrieve schema from '{}'", client.host()))?;

    match state {
        SchemaState::UpToDate => Ok(()),
        SchemaState::Missing => bail!("no schema installed (run `schema create`)"),
        SchemaState::Outdated(reason) => bail!("schema is outdated: {reason} (run `schema create`)"),
    }
}
