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

//! snapshot acquisition from the adsb.lol v2 point query endpoint

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use crate::{Flight, GeoPos, errors::{AirwatchError, Result, acquisition_error}};

pub const DEFAULT_BASE_URL: &str = "https://api.adsb.lol/v2";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(8); // keep below the default poll interval

/// response envelope of the v2 point query (`/lat/{lat}/lon/{lon}/dist/{nm}`)
#[derive(Debug,Deserialize)]
pub struct PointQueryResponse {
    #[serde(default)] pub ac: Vec<Flight>,
    #[serde(default)] pub total: Option<u64>,
    #[serde(default)] pub now: Option<f64>, // server epoch time
    #[serde(default)] pub msg: Option<String>,
}

/// where snapshots come from. Injected into [`crate::tracker::FlightTracker`] so the core can
/// be driven by a scripted source in tests. Timeouts are the source's responsibility.
#[async_trait]
pub trait QuerySource {
    async fn query (&self, center: GeoPos, radius_nm: f64) -> Result<Vec<Flight>>;
}

/// live [`QuerySource`] doing point queries against adsb.lol (or any host serving the same API)
pub struct AdsbLolSource {
    base_url: String,
    client: Client,
}

impl AdsbLolSource {
    pub fn new () -> Result<Self> {
        Self::with_base_url( DEFAULT_BASE_URL)
    }

    pub fn with_base_url (base_url: impl ToString) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout( CONNECT_TIMEOUT)
            .timeout( REQUEST_TIMEOUT)
            .build()?;
        Ok( AdsbLolSource { base_url: base_url.to_string(), client } )
    }
}

#[async_trait]
impl QuerySource for AdsbLolSource {
    async fn query (&self, center: GeoPos, radius_nm: f64) -> Result<Vec<Flight>> {
        let url = format!( "{}/lat/{}/lon/{}/dist/{}", self.base_url, center.lat, center.lon, radius_nm);

        let response = self.client.get( &url).send().await?;
        if !response.status().is_success() {
            return Err( acquisition_error!("point query {} returned status {}", url, response.status()))
        }

        let data: PointQueryResponse = response.json().await?;
        Ok( data.ac)
    }
}
