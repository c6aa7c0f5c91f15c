/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */
#![allow(unused)]

//! console aircraft monitor: polls adsb.lol around a point and logs every display change

use std::{path::PathBuf, time::Duration};
use anyhow::Result;
use clap::Parser;
use tokio::time::sleep;
use tracing::info;

use airwatch::{load_config, GeoPos, RenderCmd, TrackerConfig};
use airwatch::adsblol::AdsbLolSource;
use airwatch::tracker::{FlightTracker, RenderSink};

#[derive(Parser,Debug)]
#[command(name="watch", about="live aircraft monitoring tool (adsb.lol point queries)")]
struct Args {
    /// RON config file (overrides the coordinate args)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t=38.9072, help="center latitude [deg]")]
    lat: f64,

    #[arg(long, default_value_t=-77.0369, help="center longitude [deg]")]
    lon: f64,

    #[arg(long, default_value_t=100.0, help="search radius [nm]")]
    radius: f64,

    #[arg(long, default_value_t=10, help="poll interval [sec]")]
    interval: u64,

    /// initial filter query ("dep:KJFK", "des:EGLL" or free text)
    #[arg(long)]
    filter: Option<String>,
}

/// render sink that just logs the commands a map adapter would apply
struct LogSink;

impl RenderSink for LogSink {
    fn render (&mut self, cmd: RenderCmd) {
        match cmd {
            RenderCmd::Add{hex,pos,..} => info!("+ {hex} at {pos}"),
            RenderCmd::Update{hex,pos,..} => info!("~ {hex} at {pos}"),
            RenderCmd::Remove{hex} => info!("- {hex}"),
            RenderCmd::DrawTrace{hex,points} => info!("trace {hex}: {} points", points.len()),
            RenderCmd::ClearTrace{hex} => info!("trace {hex} cleared"),
        }
    }
}

#[tokio::main]
async fn main () -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config( path)?,
        None => {
            let mut config = TrackerConfig::default();
            config.center = GeoPos { lat: args.lat, lon: args.lon };
            config.radius_nm = args.radius;
            config.interval = Duration::from_secs( args.interval);
            config
        }
    };

    info!("watching {} nm around {}", config.radius_nm, config.center);
    let handle = FlightTracker::spawn( config, AdsbLolSource::new()?, LogSink)?;

    if let Some(query) = &args.filter {
        handle.set_filter( query).await?;
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                handle.stop().await?;
                break;
            }
            _ = sleep( Duration::from_secs(30)) => {
                let status = handle.status().await?;
                match &status.last_error {
                    Some(e) => info!("{} flights tracked, last error: {e}", status.tracked),
                    None => info!("{} flights tracked, last update: {}", status.tracked,
                        status.last_update.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".into())),
                }
            }
        }
    }
    Ok(())
}
