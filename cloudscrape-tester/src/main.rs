// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use anyhow::bail;
use clap::Parser;
use cloudscrape_tester::{check, run};

#[derive(Parser)]
struct Options {
  #[arg(short = 'c', long = "config")]
  pub config: Option<String>,

  #[arg(long = "scrape-config")]
  pub scrape_config: Option<String>,

  /// Only validate the scrape config.
  #[arg(long = "check-only")]
  pub check_only: bool,
}

fn main() -> anyhow::Result<()> {
  let options = Options::parse();
  let scrape_config = options
    .scrape_config
    .map(|scrape_config| {
      log::info!("loading scrape config from: {scrape_config}");
      std::fs::read_to_string(scrape_config)
    })
    .transpose()?;

  if options.check_only {
    let Some(scrape_config) = scrape_config else {
      bail!("--check-only requires --scrape-config");
    };
    check(&scrape_config)?;
    return Ok(());
  }

  let Some(config) = options.config else {
    bail!("either --config or --check-only is required");
  };
  log::info!("loading test config from: {config}");
  let config = std::fs::read_to_string(config)?;
  run(&config, scrape_config.as_deref())
}
