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

use std::sync::{Arc, Mutex, atomic::{AtomicUsize, Ordering}};
use std::time::Duration;
use async_trait::async_trait;
use tokio::{sync::Notify, time::sleep};

use airwatch::{Flight, GeoPos, RenderCmd, TrackerConfig};
use airwatch::adsblol::QuerySource;
use airwatch::errors::{AirwatchError, Result};
use airwatch::tracker::{FlightTracker, RenderSink};

fn flight (hex: &str, lat: f64, lon: f64) -> Flight {
    Flight { hex: hex.to_string(), lat: Some(lat), lon: Some(lon), ..Default::default() }
}

fn test_config () -> TrackerConfig {
    let mut config = TrackerConfig::default();
    config.interval = Duration::from_secs(3600); // only the initial tick fires during a test
    config
}

const SETTLE: Duration = Duration::from_millis(250);

//--- scripted collaborators

enum Scripted {
    Snapshot( Vec<Flight> ),
    Fail,
}

/// query source that plays back a per-call script; calls can be gated on a Notify so a test
/// can hold an acquisition open while later ones complete
struct ScriptedSource {
    calls: AtomicUsize,
    script: Vec<Scripted>,
    gates: Vec<Option<Arc<Notify>>>,
}

impl ScriptedSource {
    fn new (script: Vec<Scripted>) -> Self {
        let gates = (0..script.len()).map(|_| None).collect();
        ScriptedSource { calls: AtomicUsize::new(0), script, gates }
    }

    fn gated (mut self, call: usize, gate: Arc<Notify>) -> Self {
        self.gates[call] = Some(gate);
        self
    }
}

#[async_trait]
impl QuerySource for ScriptedSource {
    async fn query (&self, _center: GeoPos, _radius_nm: f64) -> Result<Vec<Flight>> {
        let i = self.calls.fetch_add( 1, Ordering::SeqCst);
        if let Some(Some(gate)) = self.gates.get(i) {
            gate.notified().await;
        }
        match self.script.get(i) {
            Some(Scripted::Snapshot(flights)) => Ok( flights.clone()),
            Some(Scripted::Fail) => Err( AirwatchError::AcquisitionError("scripted failure".to_string())),
            None => Ok( Vec::new())
        }
    }
}

#[derive(Clone,Default)]
struct RecordingSink {
    cmds: Arc<Mutex<Vec<RenderCmd>>>,
}

impl RecordingSink {
    fn cmds (&self) -> Vec<RenderCmd> { self.cmds.lock().unwrap().clone() }
    fn clear (&self) { self.cmds.lock().unwrap().clear(); }
}

impl RenderSink for RecordingSink {
    fn render (&mut self, cmd: RenderCmd) {
        self.cmds.lock().unwrap().push( cmd);
    }
}

//--- tests

#[tokio::test]
async fn test_initial_cycle_displays_snapshot () {
    let source = ScriptedSource::new( vec![
        Scripted::Snapshot( vec![ flight("a1", 1.0, 1.0) ]),
    ]);
    let sink = RecordingSink::default();
    let handle = FlightTracker::spawn( test_config(), source, sink.clone()).unwrap();

    sleep( SETTLE).await;
    let status = handle.status().await.unwrap();
    assert_eq!( status.tracked, 1);
    assert!( status.last_update.is_some());
    assert!( status.last_error.is_none());
    assert!( matches!( &sink.cmds()[0], RenderCmd::Add{hex,..} if hex == "a1"));

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_stale_acquisition_is_discarded () {
    let gate = Arc::new( Notify::new());
    let source = ScriptedSource::new( vec![
        Scripted::Snapshot( vec![ flight("a1", 1.0, 1.0) ]), // held open by the gate
        Scripted::Snapshot( vec![ flight("b2", 2.0, 2.0) ]),
    ]).gated( 0, gate.clone());
    let sink = RecordingSink::default();
    let handle = FlightTracker::spawn( test_config(), source, sink.clone()).unwrap();

    sleep( SETTLE).await; // initial cycle issued, acquisition blocked on the gate

    handle.refresh_now().await.unwrap(); // newer cycle completes first
    sleep( SETTLE).await;
    let status = handle.status().await.unwrap();
    assert_eq!( status.tracked, 1);

    gate.notify_one(); // now the older acquisition finishes - late
    sleep( SETTLE).await;

    // the stale result must not have altered anything: no a1, still exactly b2
    let status = handle.status().await.unwrap();
    assert_eq!( status.tracked, 1);
    let cmds = sink.cmds();
    assert!( !cmds.iter().any( |c| c.hex() == "a1"), "stale snapshot leaked into display: {cmds:?}");
    assert!( cmds.iter().any( |c| matches!( c, RenderCmd::Add{hex,..} if hex == "b2")));

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_acquisition_failure_keeps_display () {
    let source = ScriptedSource::new( vec![
        Scripted::Snapshot( vec![ flight("a1", 1.0, 1.0) ]),
        Scripted::Fail,
        Scripted::Snapshot( vec![ flight("a1", 1.1, 1.1) ]),
    ]);
    let sink = RecordingSink::default();
    let handle = FlightTracker::spawn( test_config(), source, sink.clone()).unwrap();

    sleep( SETTLE).await;
    assert_eq!( handle.status().await.unwrap().tracked, 1);
    sink.clear();

    handle.refresh_now().await.unwrap(); // this cycle fails
    sleep( SETTLE).await;
    let status = handle.status().await.unwrap();
    assert_eq!( status.tracked, 1); // stale but present
    assert!( status.last_error.is_some());
    assert!( sink.cmds().is_empty()); // no removes, no updates

    handle.refresh_now().await.unwrap(); // next cycle recovers
    sleep( SETTLE).await;
    let status = handle.status().await.unwrap();
    assert!( status.last_error.is_none());
    assert!( matches!( &sink.cmds()[0], RenderCmd::Update{hex,..} if hex == "a1"));

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_reconfigure_rejected_without_state_change () {
    let source = ScriptedSource::new( vec![
        Scripted::Snapshot( vec![ flight("a1", 1.0, 1.0) ]),
    ]);
    let sink = RecordingSink::default();
    let handle = FlightTracker::spawn( test_config(), source, sink.clone()).unwrap();

    sleep( SETTLE).await;
    sink.clear();

    let res = handle.reconfigure( GeoPos{ lat: 123.0, lon: 0.0 }, 100.0).await;
    assert!( matches!( res, Err(AirwatchError::ConfigError(_))));

    let res = handle.reconfigure( GeoPos{ lat: 10.0, lon: 10.0 }, 5000.0).await;
    assert!( matches!( res, Err(AirwatchError::ConfigError(_))));

    sleep( SETTLE).await;
    assert_eq!( handle.status().await.unwrap().tracked, 1); // nothing was cleared
    assert!( sink.cmds().is_empty());

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_reconfigure_clears_and_requeries () {
    let source = ScriptedSource::new( vec![
        Scripted::Snapshot( vec![ flight("a1", 1.0, 1.0) ]),
        Scripted::Snapshot( vec![ flight("c9", 50.0, 8.0) ]), // what the new region sees
    ]);
    let sink = RecordingSink::default();
    let handle = FlightTracker::spawn( test_config(), source, sink.clone()).unwrap();

    sleep( SETTLE).await;
    sink.clear();

    handle.reconfigure( GeoPos{ lat: 50.0, lon: 8.0 }, 150.0).await.unwrap();
    sleep( SETTLE).await;

    let cmds = sink.cmds();
    assert!( cmds.contains( &RenderCmd::Remove{ hex: "a1".to_string() })); // full reset
    assert!( cmds.iter().any( |c| matches!( c, RenderCmd::Add{hex,..} if hex == "c9")));
    assert_eq!( handle.status().await.unwrap().tracked, 1);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_set_filter_triggers_immediate_cycle () {
    let snapshot = vec![ flight("A1B2C3", 1.0, 1.0), flight("FFFFFF", 2.0, 2.0) ];
    let source = ScriptedSource::new( vec![
        Scripted::Snapshot( snapshot.clone()),
        Scripted::Snapshot( snapshot),
    ]);
    let sink = RecordingSink::default();
    let handle = FlightTracker::spawn( test_config(), source, sink.clone()).unwrap();

    sleep( SETTLE).await;
    assert_eq!( handle.status().await.unwrap().tracked, 2);
    sink.clear();

    handle.set_filter("a1").await.unwrap();
    sleep( SETTLE).await;

    let cmds = sink.cmds();
    assert!( cmds.contains( &RenderCmd::Remove{ hex: "FFFFFF".to_string() }));
    assert!( cmds.iter().any( |c| matches!( c, RenderCmd::Update{hex,..} if hex == "A1B2C3")));
    assert_eq!( handle.status().await.unwrap().tracked, 1);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_sweep_runs_while_acquisitions_fail () {
    let source = ScriptedSource::new( vec![
        Scripted::Snapshot( vec![ flight("a1", 1.0, 1.0) ]),
        Scripted::Snapshot( vec![ flight("a1", 2.0, 2.0) ]),
        Scripted::Snapshot( vec![]), // a1 drops out of display, history enters its grace period
        Scripted::Fail,              // upstream outage starts
    ]);
    let sink = RecordingSink::default();
    let mut config = test_config();
    config.drop_after = Duration::from_millis(500);
    let handle = FlightTracker::spawn( config, source, sink.clone()).unwrap();

    sleep( SETTLE).await;
    handle.refresh_now().await.unwrap(); // second trace point
    sleep( SETTLE).await;
    handle.refresh_now().await.unwrap(); // a1 removed
    sleep( SETTLE).await;
    assert_eq!( handle.status().await.unwrap().tracked, 0);

    sleep( Duration::from_millis(600)).await; // grace period lapses during the outage
    handle.refresh_now().await.unwrap(); // failing cycle - retention must still be enforced
    sleep( SETTLE).await;
    assert!( handle.status().await.unwrap().last_error.is_some());

    sink.clear();
    handle.toggle_trace("a1").await.unwrap();
    sleep( SETTLE).await;
    assert!( sink.cmds().is_empty(), "history past its grace period must not be drawable: {:?}", sink.cmds());

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_toggle_trace_through_handle () {
    let source = ScriptedSource::new( vec![
        Scripted::Snapshot( vec![ flight("a1", 1.0, 1.0) ]),
        Scripted::Snapshot( vec![ flight("a1", 2.0, 2.0) ]),
    ]);
    let sink = RecordingSink::default();
    let handle = FlightTracker::spawn( test_config(), source, sink.clone()).unwrap();

    sleep( SETTLE).await;
    handle.refresh_now().await.unwrap(); // second point
    sleep( SETTLE).await;
    sink.clear();

    handle.toggle_trace("a1").await.unwrap();
    sleep( SETTLE).await;
    match sink.cmds().as_slice() {
        [RenderCmd::DrawTrace{hex, points}] => {
            assert_eq!( hex, "a1");
            assert_eq!( points.len(), 2);
        }
        other => panic!("expected a single DrawTrace, got {other:?}")
    }

    handle.toggle_trace("a1").await.unwrap();
    sleep( SETTLE).await;
    assert!( sink.cmds().contains( &RenderCmd::ClearTrace{ hex: "a1".to_string() }));

    handle.stop().await.unwrap();
}
