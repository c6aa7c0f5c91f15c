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

//! poll controller: drives periodic snapshot acquisition and feeds results through the
//! [`FlightStore`]. One task owns all mutable state; acquisitions run detached and report back
//! as messages, stamped with a monotonic request token so that a stale completion (started
//! before a refresh or reconfiguration, finished after a newer cycle) can never overwrite
//! newer state. `stop()` only prevents future cycles - an in-flight acquisition is not
//! aborted, its late result is dropped by the token check.

use std::sync::Arc;
use chrono::{DateTime,Utc};
use tokio::{spawn, sync::{mpsc,oneshot}, time::{interval,MissedTickBehavior}};
use tracing::{debug,error,info,warn};

use crate::{Flight, FlightStore, GeoPos, RenderCmd, TrackerConfig};
use crate::adsblol::QuerySource;
use crate::filter::FlightFilter;
use crate::errors::{AirwatchError, Result, op_failed};

/// the external map adapter. Gets every [`RenderCmd`] a cycle produces; commands within one
/// cycle are independent (unique hex per command) and may be applied in any order
pub trait RenderSink: Send + 'static {
    fn render (&mut self, cmd: RenderCmd);
}

/// status surface for any presentation layer
#[derive(Debug,Clone,Default)]
pub struct TrackerStatus {
    pub last_update: Option<DateTime<Utc>>, // last successful cycle
    pub tracked: usize,                     // currently displayed flights
    pub last_error: Option<String>,         // None if the last cycle succeeded
}

enum TrackerMsg {
    RefreshNow,
    SnapshotReady { token: u64, result: Result<Vec<Flight>> },
    SetFilter( String ),
    Reconfigure { center: GeoPos, radius_nm: f64, reply: oneshot::Sender<Result<()>> },
    ToggleTrace( String ),
    GetStatus( oneshot::Sender<TrackerStatus> ),
    Stop,
}

/// handle through which the tracker task is controlled
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<TrackerMsg>,
}

impl TrackerHandle {
    /// run one immediate cycle and reset the periodic timer phase
    pub async fn refresh_now (&self) -> Result<()> {
        self.send( TrackerMsg::RefreshNow).await
    }

    /// re-parse the filter predicate and apply it with an immediate cycle
    pub async fn set_filter (&self, query: impl ToString) -> Result<()> {
        self.send( TrackerMsg::SetFilter( query.to_string())).await
    }

    /// change center and radius. Rejected input is reported back without any state change;
    /// accepted input clears all displayed flights and traces and triggers an immediate cycle
    pub async fn reconfigure (&self, center: GeoPos, radius_nm: f64) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send( TrackerMsg::Reconfigure { center, radius_nm, reply }).await?;
        rx.await.map_err( |_| op_failed!("tracker terminated"))?
    }

    pub async fn toggle_trace (&self, hex: impl ToString) -> Result<()> {
        self.send( TrackerMsg::ToggleTrace( hex.to_string())).await
    }

    pub async fn status (&self) -> Result<TrackerStatus> {
        let (reply, rx) = oneshot::channel();
        self.send( TrackerMsg::GetStatus( reply)).await?;
        rx.await.map_err( |_| op_failed!("tracker terminated"))
    }

    /// halt future cycles. Does not abort an acquisition already in flight - its result is
    /// dropped unprocessed
    pub async fn stop (&self) -> Result<()> {
        self.send( TrackerMsg::Stop).await
    }

    async fn send (&self, msg: TrackerMsg) -> Result<()> {
        self.tx.send( msg).await.map_err( |_| op_failed!("tracker terminated"))
    }
}

/// the tracker task state. Created and consumed by [`FlightTracker::spawn`]
pub struct FlightTracker<S,R> where S: QuerySource + Send + Sync + 'static, R: RenderSink {
    config: TrackerConfig,
    filter: FlightFilter,
    store: FlightStore,
    source: Arc<S>,
    sink: R,
    status: TrackerStatus,

    latest_token: u64, // most recently issued acquisition token
    tx: mpsc::Sender<TrackerMsg>, // for detached acquisitions to report back
}

impl<S,R> FlightTracker<S,R> where S: QuerySource + Send + Sync + 'static, R: RenderSink {

    /// validate the config, spawn the tracker task and return its control handle. The first
    /// cycle runs immediately, subsequent ones at the configured interval
    pub fn spawn (config: TrackerConfig, source: S, sink: R) -> Result<TrackerHandle> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(64);
        let tracker = FlightTracker {
            store: FlightStore::new( config.max_trace),
            filter: FlightFilter::All,
            config,
            source: Arc::new(source),
            sink,
            status: TrackerStatus::default(),
            latest_token: 0,
            tx: tx.clone(),
        };

        spawn( tracker.run(rx));
        Ok( TrackerHandle { tx } )
    }

    async fn run (mut self, mut rx: mpsc::Receiver<TrackerMsg>) {
        let mut ticker = interval( self.config.interval);
        ticker.set_missed_tick_behavior( MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => { // note the first tick fires right away
                    self.start_cycle();
                }
                msg = rx.recv() => {
                    match msg {
                        Some(TrackerMsg::RefreshNow) => {
                            ticker.reset();
                            self.start_cycle();
                        }
                        Some(TrackerMsg::SnapshotReady { token, result }) => {
                            self.complete_cycle( token, result);
                        }
                        Some(TrackerMsg::SetFilter(query)) => {
                            self.filter = FlightFilter::parse( &query);
                            info!("filter set to {}", self.filter);
                            ticker.reset();
                            self.start_cycle();
                        }
                        Some(TrackerMsg::Reconfigure { center, radius_nm, reply }) => {
                            let res = self.apply_reconfigure( center, radius_nm);
                            let accepted = res.is_ok();
                            let _ = reply.send( res);
                            if accepted {
                                ticker.reset();
                                self.start_cycle();
                            }
                        }
                        Some(TrackerMsg::ToggleTrace(hex)) => {
                            if let Some(cmd) = self.store.toggle_trace( &hex) {
                                self.sink.render( cmd);
                            }
                        }
                        Some(TrackerMsg::GetStatus(reply)) => {
                            let _ = reply.send( self.status.clone());
                        }
                        Some(TrackerMsg::Stop) | None => {
                            info!("tracker stopped");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// issue a token and kick off a detached acquisition that reports back as a message. The
    /// controller never awaits the acquisition inline - a slow or hung request can't block
    /// control messages, and overlapping completions are sequenced by the token
    fn start_cycle (&mut self) {
        self.latest_token += 1;
        let token = self.latest_token;

        let source = self.source.clone();
        let center = self.config.center;
        let radius_nm = self.config.radius_nm;
        let tx = self.tx.clone();

        spawn( async move {
            let result = source.query( center, radius_nm).await;
            let _ = tx.send( TrackerMsg::SnapshotReady { token, result }).await; // tracker may be gone
        });
    }

    fn complete_cycle (&mut self, token: u64, result: Result<Vec<Flight>>) {
        if token != self.latest_token {
            debug!("discarding stale snapshot (token {} superseded by {})", token, self.latest_token);
            return
        }

        match result {
            Ok(snapshot) => {
                let now = Utc::now();

                let mut cmds = self.store.reconcile( &snapshot, &self.filter, now);
                cmds.extend( self.store.sweep_stale( self.config.drop_after, now));
                let n_cmds = cmds.len();
                for cmd in cmds {
                    self.sink.render( cmd);
                }

                self.status.last_update = Some(now);
                self.status.tracked = self.store.displayed_count();
                self.status.last_error = None;
                debug!("cycle {} applied {} commands, {} flights displayed", token, n_cmds, self.status.tracked);
            }
            Err(e) => {
                // displayed flights stay as they are (stale but present); the next scheduled
                // cycle is the retry. The grace-period sweep still runs - retention is driven
                // by elapsed time, not by upstream availability
                warn!("snapshot acquisition failed: {e}");
                self.status.last_error = Some( e.to_string());

                for cmd in self.store.sweep_stale( self.config.drop_after, Utc::now()) {
                    self.sink.render( cmd);
                }
            }
        }
    }

    /// reject invalid input before touching anything, otherwise full reset and re-center
    fn apply_reconfigure (&mut self, center: GeoPos, radius_nm: f64) -> Result<()> {
        let mut config = self.config.clone();
        config.center = center;
        config.radius_nm = radius_nm;
        config.validate()?;

        for cmd in self.store.clear() {
            self.sink.render( cmd);
        }
        self.config = config;
        self.status.tracked = 0;
        info!("re-centered to {} with radius {} nm", center, radius_nm);
        Ok(())
    }
}
