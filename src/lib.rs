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

//! Live aircraft tracking core. Turns a sequence of independent point-query snapshots
//! (adsb.lol v2 and compatible tar1090 feeds) into an incrementally updated set of displayed
//! flights with bounded per-flight position traces. The store emits [`RenderCmd`] values that
//! an external map adapter consumes - no rendering happens in here.

use std::{collections::{HashMap,HashSet,VecDeque}, fmt, path::Path, time::Duration};
use chrono::{DateTime,Utc};
use serde::{Deserialize,Deserializer,Serialize};

pub mod errors;
use crate::errors::{AirwatchError, Result, config_error};

pub mod filter;
use filter::FlightFilter;

pub mod adsblol;
pub mod tracker;

/// max number of trace (recent trajectory) points kept per flight
pub const MAX_TRACE: usize = 50;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_DROP_AFTER: Duration = Duration::from_secs(300);

/// geographic position in degrees
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct GeoPos {
    pub lat: f64,
    pub lon: f64,
}

impl fmt::Display for GeoPos {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "({:.4},{:.4})", self.lat, self.lon)
    }
}

/// one aircraft record of an upstream point-query snapshot. Field names follow the feed
/// (tar1090 schema: `flight` is the callsign, `r` the registration, `t` the type code).
/// `hex` is the only identity key - everything else may change between snapshots.
/// A record without both lat and lon is "not currently positioned", which is not an error.
#[derive(Debug,Clone,Default,Serialize,Deserialize)]
pub struct Flight {
    pub hex: String,

    #[serde(default)] pub flight: Option<String>, // callsign, may carry trailing blanks
    #[serde(default)] pub r: Option<String>,      // registration
    #[serde(default)] pub t: Option<String>,      // aircraft type code

    #[serde(default)] pub lat: Option<f64>,
    #[serde(default)] pub lon: Option<f64>,
    #[serde(default, deserialize_with="de_alt_baro")]
    pub alt_baro: Option<f64>,                    // barometric altitude [ft]
    #[serde(default)] pub gs: Option<f64>,        // groundspeed [kn]
    #[serde(default)] pub track: Option<f64>,     // heading [deg]

    #[serde(default)] pub squawk: Option<String>,
    #[serde(default)] pub seen: Option<f64>,      // sec since last observed upstream

    // no route source is wired in yet - these stay unset until one is (see filter::FlightFilter)
    #[serde(skip)] pub departure: Option<String>,
    #[serde(skip)] pub destination: Option<String>,
}

/// the feed reports `alt_baro` either as a number [ft] or as the literal string "ground"
fn de_alt_baro<'de,D> (deserializer: D) -> std::result::Result<Option<f64>,D::Error> where D: Deserializer<'de> {
    let v: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok( match v {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) if s == "ground" => Some(0.0),
        _ => None
    })
}

impl Flight {
    /// a position only counts if both coordinates are present
    pub fn position (&self) -> Option<GeoPos> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some( GeoPos{lat,lon} ),
            _ => None
        }
    }

    /// trimmed callsign, None if unset or blank
    pub fn callsign (&self) -> Option<&str> {
        self.flight.as_deref().map(|cs| cs.trim()).filter(|cs| !cs.is_empty())
    }

    /// the descriptive content block shown for this flight. Plain text, one field per line,
    /// missing values render as "N/A" - presentation is up to the render sink
    pub fn info_block (&self) -> String {
        fn fmt_opt<T: fmt::Display> (v: &Option<T>, unit: &str) -> String {
            match v {
                Some(v) => format!("{v}{unit}"),
                None => "N/A".to_string()
            }
        }

        let mut s = String::with_capacity(160);
        s.push_str( self.callsign().unwrap_or( self.hex.as_str()));
        s.push_str( &format!("\nhex: {}", self.hex));
        s.push_str( &format!("\nregistration: {}", self.r.as_deref().unwrap_or("N/A")));
        s.push_str( &format!("\ntype: {}", self.t.as_deref().unwrap_or("N/A")));
        s.push_str( &format!("\naltitude: {}", fmt_opt( &self.alt_baro, " ft")));
        s.push_str( &format!("\nspeed: {}", fmt_opt( &self.gs, " knots")));
        s.push_str( &format!("\nheading: {}", fmt_opt( &self.track, "°")));
        s.push_str( &format!("\nsquawk: {}", self.squawk.as_deref().unwrap_or("N/A")));
        s
    }
}

impl fmt::Display for Flight {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Flight( hex: {}", self.hex)?;
        if let Some(cs) = self.callsign() { write!( f, ", cs: \"{cs}\"")?; }
        if let Some(p) = self.position() { write!( f, ", pos: {p}")?; }
        if let Some(alt) = self.alt_baro { write!( f, ", alt: {alt:.0}")?; }
        if let Some(gs) = self.gs { write!( f, ", spd: {gs:.1}")?; }
        if let Some(trk) = self.track { write!( f, ", hdg: {trk:.0}")?; }
        write!( f, ")")
    }
}

/// element of a flight trace
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub time: DateTime<Utc>,
    pub alt_ft: Option<f64>,
}

/// command for the external render sink. Each command is keyed by a unique hex so the sink
/// may apply the commands of one cycle in any order
#[derive(Debug,Clone,PartialEq)]
pub enum RenderCmd {
    Add { hex: String, pos: GeoPos, track: Option<f64>, info: String },
    Update { hex: String, pos: GeoPos, track: Option<f64>, info: String },
    Remove { hex: String },
    DrawTrace { hex: String, points: Vec<TrackPoint> },
    ClearTrace { hex: String },
}

impl RenderCmd {
    pub fn hex (&self) -> &str {
        match self {
            RenderCmd::Add{hex,..} => hex,
            RenderCmd::Update{hex,..} => hex,
            RenderCmd::Remove{hex} => hex,
            RenderCmd::DrawTrace{hex,..} => hex,
            RenderCmd::ClearTrace{hex} => hex,
        }
    }
}

/// the state we keep per hex across snapshots: the bounded trace ringbuffer, the last time a
/// positioned record came in, and whether the trace is currently drawn
#[derive(Debug)]
pub struct TrackedFlight {
    pub hex: String,
    trace: VecDeque<TrackPoint>,
    last_seen: DateTime<Utc>,
    trace_shown: bool,
}

impl TrackedFlight {
    fn new (hex: String, now: DateTime<Utc>, max_trace: usize) -> Self {
        TrackedFlight { hex, trace: VecDeque::with_capacity(max_trace), last_seen: now, trace_shown: false }
    }

    /// append unless coordinates repeat the last stored point; evict FIFO at capacity
    fn push_point (&mut self, p: TrackPoint, max_trace: usize) {
        if let Some(last) = self.trace.back() {
            if last.lat == p.lat && last.lon == p.lon { return }
        }
        if self.trace.len() >= max_trace { self.trace.pop_front(); }
        self.trace.push_back(p);
    }
}

/// the reconciliation state container: displayed set plus per-hex tracked state. Exclusively
/// owned by one [`tracker::FlightTracker`] instance (or a test driving it directly) - all
/// mutation goes through snapshot cycles or explicit reset calls
pub struct FlightStore {
    tracked: HashMap<String,TrackedFlight>,
    displayed: HashSet<String>,
    max_trace: usize,
}

impl FlightStore {
    pub fn new (max_trace: usize) -> Self {
        FlightStore { tracked: HashMap::new(), displayed: HashSet::new(), max_trace }
    }

    pub fn displayed_count (&self) -> usize { self.displayed.len() }
    pub fn is_displayed (&self, hex: &str) -> bool { self.displayed.contains(hex) }
    pub fn tracked_count (&self) -> usize { self.tracked.len() }
    pub fn is_tracked (&self, hex: &str) -> bool { self.tracked.contains_key(hex) }
    pub fn is_trace_shown (&self, hex: &str) -> bool {
        self.tracked.get(hex).map(|tf| tf.trace_shown).unwrap_or(false)
    }

    /// stored trace points for a hex, oldest first (empty if unknown)
    pub fn trace (&self, hex: &str) -> Vec<TrackPoint> {
        self.tracked.get(hex).map(|tf| tf.trace.iter().cloned().collect()).unwrap_or_default()
    }

    /// record a positioned flight into its trace ringbuffer and refresh its last-seen time.
    /// Capture is independent of display - this runs for every positioned record of every
    /// snapshot, whether or not the record passes the current filter
    pub fn record (&mut self, flight: &Flight, now: DateTime<Utc>) {
        if let Some(pos) = flight.position() {
            let max_trace = self.max_trace;
            let tf = self.tracked.entry( flight.hex.clone())
                .or_insert_with(|| TrackedFlight::new( flight.hex.clone(), now, max_trace));
            tf.last_seen = now;
            tf.push_point( TrackPoint{ lat: pos.lat, lon: pos.lon, time: now, alt_ft: flight.alt_baro }, max_trace);
        }
    }

    /// diff a new snapshot against the currently displayed set. Records without a position are
    /// treated as absent from this snapshot - a flight that loses its position is removed the
    /// same as one that vanished (deliberate, see the trace retention below which keeps its
    /// history around either way). Records failing the filter are captured but not displayed.
    /// Linear in snapshot size, two hash-set lookups per record.
    pub fn reconcile (&mut self, snapshot: &[Flight], filter: &FlightFilter, now: DateTime<Utc>) -> Vec<RenderCmd> {
        let mut cmds: Vec<RenderCmd> = Vec::with_capacity( snapshot.len());
        let mut current: HashSet<String> = HashSet::with_capacity( snapshot.len());

        for flight in snapshot {
            let Some(pos) = flight.position() else { continue };
            self.record( flight, now); // trace capture happens before any display decision

            if !filter.matches( flight) { continue }

            let cmd = if self.displayed.contains( &flight.hex) {
                RenderCmd::Update { hex: flight.hex.clone(), pos, track: flight.track, info: flight.info_block() }
            } else {
                RenderCmd::Add { hex: flight.hex.clone(), pos, track: flight.track, info: flight.info_block() }
            };
            current.insert( flight.hex.clone());
            cmds.push( cmd);
        }

        for hex in &self.displayed {
            if !current.contains( hex) {
                cmds.push( RenderCmd::Remove { hex: hex.clone() });
            }
        }
        self.displayed = current;

        cmds
    }

    /// purge tracked state whose last-seen age exceeds `drop_after` *at sweep time*. Displayed
    /// flights are never purged, and a flight that reappeared before the sweep had its
    /// last-seen refreshed - so there is nothing to cancel if it comes back (one-shot deletion
    /// timers can't do that). Emits ClearTrace for purged flights with a drawn trace.
    pub fn sweep_stale (&mut self, drop_after: Duration, now: DateTime<Utc>) -> Vec<RenderCmd> {
        let max_age = drop_after.as_millis() as i64;
        let displayed = &self.displayed;
        let mut cmds: Vec<RenderCmd> = Vec::new();

        self.tracked.retain( |hex, tf| {
            if displayed.contains( hex) { return true }
            if (now - tf.last_seen).num_milliseconds() > max_age {
                if tf.trace_shown {
                    cmds.push( RenderCmd::ClearTrace { hex: hex.clone() });
                }
                false
            } else {
                true
            }
        });

        cmds
    }

    /// toggle trace display for a hex: clear a drawn trace, or draw one if at least two points
    /// are stored (fewer is a no-op - nothing to connect)
    pub fn toggle_trace (&mut self, hex: &str) -> Option<RenderCmd> {
        let tf = self.tracked.get_mut( hex)?;
        if tf.trace_shown {
            tf.trace_shown = false;
            Some( RenderCmd::ClearTrace { hex: hex.to_string() })
        } else if tf.trace.len() >= 2 {
            tf.trace_shown = true;
            Some( RenderCmd::DrawTrace { hex: hex.to_string(), points: tf.trace.iter().cloned().collect() })
        } else {
            None
        }
    }

    /// unconditional full reset (used on reconfiguration): drops all displayed flights and all
    /// tracked state, emitting the respective Remove / ClearTrace commands
    pub fn clear (&mut self) -> Vec<RenderCmd> {
        let mut cmds: Vec<RenderCmd> = Vec::with_capacity( self.displayed.len());
        for hex in self.displayed.drain() {
            cmds.push( RenderCmd::Remove { hex });
        }
        for (hex, tf) in self.tracked.drain() {
            if tf.trace_shown {
                cmds.push( RenderCmd::ClearTrace { hex });
            }
        }
        cmds
    }
}

/// tracker configuration. RON-loadable; all values are range checked by [`TrackerConfig::validate`]
/// before they are applied - out-of-range input is rejected, never clamped
#[derive(Debug,Clone,Serialize,Deserialize)]
pub struct TrackerConfig {
    pub center: GeoPos,
    pub radius_nm: f64,       // point query radius [nm], 10..250
    pub interval: Duration,   // poll interval
    pub max_trace: usize,     // trace ringbuffer capacity
    pub drop_after: Duration, // grace period before un-displayed tracked state is purged
}

impl Default for TrackerConfig {
    fn default () -> Self {
        TrackerConfig {
            center: GeoPos { lat: 38.9072, lon: -77.0369 },
            radius_nm: 100.0,
            interval: DEFAULT_INTERVAL,
            max_trace: MAX_TRACE,
            drop_after: DEFAULT_DROP_AFTER,
        }
    }
}

impl TrackerConfig {
    pub fn validate (&self) -> Result<()> {
        if !self.center.lat.is_finite() || !(-90.0..=90.0).contains( &self.center.lat) {
            return Err( config_error!("latitude out of range: {}", self.center.lat))
        }
        if !self.center.lon.is_finite() || !(-180.0..=180.0).contains( &self.center.lon) {
            return Err( config_error!("longitude out of range: {}", self.center.lon))
        }
        if !self.radius_nm.is_finite() || !(10.0..=250.0).contains( &self.radius_nm) {
            return Err( config_error!("search radius out of range: {} nm", self.radius_nm))
        }
        if self.interval.is_zero() {
            return Err( config_error!("poll interval must be > 0"))
        }
        if self.max_trace == 0 {
            return Err( config_error!("trace capacity must be > 0"))
        }
        Ok(())
    }
}

/// read and validate a RON tracker config
pub fn load_config (path: impl AsRef<Path>) -> Result<TrackerConfig> {
    let contents = std::fs::read_to_string( path)?;
    let config: TrackerConfig = ron::from_str( &contents)?;
    config.validate()?;
    Ok(config)
}
