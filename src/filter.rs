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

//! search/filter predicate over [`Flight`] records, parsed from the raw query string

use std::fmt;
use crate::Flight;

/// parsed filter predicate. `Departure`/`Destination` are exact (case-insensitive) airport
/// matches - since no route source populates those fields yet they match nothing, which is the
/// intended behavior until route data exists. Everything else is a substring match against
/// callsign, registration and hex.
#[derive(Debug,Clone,PartialEq)]
pub enum FlightFilter {
    All,
    Departure(String),   // upper-cased exact match against Flight::departure
    Destination(String), // upper-cased exact match against Flight::destination
    Text(String),        // lower-cased substring against callsign / registration / hex
}

impl Default for FlightFilter {
    fn default () -> Self { FlightFilter::All }
}

impl FlightFilter {
    pub fn parse (query: &str) -> Self {
        let q = query.trim();
        if q.is_empty() { return FlightFilter::All }

        let uq = q.to_uppercase();
        if let Some(apt) = uq.strip_prefix("DEP:") { return FlightFilter::Departure( apt.trim().to_string()) }
        if let Some(apt) = uq.strip_prefix("DES:") { return FlightFilter::Destination( apt.trim().to_string()) }

        FlightFilter::Text( q.to_lowercase())
    }

    pub fn matches (&self, flight: &Flight) -> bool {
        match self {
            FlightFilter::All => true,
            FlightFilter::Departure(apt) => eq_upper( flight.departure.as_deref(), apt),
            FlightFilter::Destination(apt) => eq_upper( flight.destination.as_deref(), apt),
            FlightFilter::Text(txt) => {
                contains_lower( flight.callsign(), txt)
                    || contains_lower( flight.r.as_deref(), txt)
                    || flight.hex.to_lowercase().contains( txt.as_str())
            }
        }
    }

    pub fn is_all (&self) -> bool { matches!( self, FlightFilter::All) }
}

impl fmt::Display for FlightFilter {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightFilter::All => write!( f, "all"),
            FlightFilter::Departure(apt) => write!( f, "dep:{apt}"),
            FlightFilter::Destination(apt) => write!( f, "des:{apt}"),
            FlightFilter::Text(txt) => write!( f, "\"{txt}\""),
        }
    }
}

fn eq_upper (v: Option<&str>, apt: &str) -> bool {
    v.map( |s| s.trim().to_uppercase() == apt).unwrap_or(false)
}

fn contains_lower (v: Option<&str>, txt: &str) -> bool {
    v.map( |s| s.to_lowercase().contains( txt)).unwrap_or(false)
}
