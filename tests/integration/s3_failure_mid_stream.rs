//! spec.md §8 S3: two pipelined auto-commit queries (`RUN`+`PULL` each)
//! where the first query's `PULL` fails mid-stream. The observer attached
//! to that `PULL` sees `on_next` then `on_error`; the observers still
//! queued behind it are answered with `IGNORED`, re-reported as the same
//! failure (spec.md §4.F); exactly one acknowledgement (`RESET`/
//! `ack_failure`) goes out in response.

use bolt_connection::{AccessMode, AuthToken, Connection, Failure, HelloOptions, Observer, RunRequest};
use bolt_packstream::{Structure, Value};
use bolt_test_utils::{duplex_pair, run_script, ScriptStep};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};

fn success(fields: Vec<(&str, Value)>) -> Value {
    let map: IndexMap<String, Value> = fields.into_iter().map(|(k, v)| (k.to_owned(), v)).collect();
    Value::Structure(Structure::new(0x70, vec![Value::Map(map)]))
}

fn record(values: Vec<Value>) -> Value {
    Value::Structure(Structure::new(0x71, vec![Value::List(values)]))
}

fn failure(code: &str, message: &str) -> Value {
    let mut map = IndexMap::new();
    map.insert("code".to_owned(), Value::String(code.to_owned()));
    map.insert("message".to_owned(), Value::String(message.to_owned()));
    Value::Structure(Structure::new(0x7F, vec![Value::Map(map)]))
}

fn ignored() -> Value {
    Value::Structure(Structure::new(0x7E, vec![Value::Map(IndexMap::new())]))
}

#[derive(Default, Clone)]
struct Recording(Arc<Mutex<Vec<String>>>);

impl Recording {
    fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct RecordingObserver(Recording);

impl Observer for RecordingObserver {
    fn on_next(&mut self, record: Vec<Value>) {
        self.0 .0.lock().unwrap().push(format!("on_next({record:?})"));
    }

    fn on_completed(&mut self, _metadata: IndexMap<String, Value>) {
        self.0 .0.lock().unwrap().push("on_completed".to_owned());
    }

    fn on_error(&mut self, error: Failure) {
        self.0 .0.lock().unwrap().push(format!("on_error({})", error.code));
    }
}

#[tokio::test]
async fn second_queued_pull_reports_the_triggering_failure_to_every_observer() {
    let (client, server) = duplex_pair();

    let code = "Neo.ClientError.Statement.SyntaxError";
    let script = vec![
        // HELLO
        ScriptStep::reply(success(vec![])),
        // RUN #1 -> SUCCESS(fields)
        ScriptStep::reply(success(vec![("fields", Value::List(vec![Value::String("n".into())]))])),
        // PULL #1 -> RECORD, then FAILURE
        ScriptStep::replies(vec![record(vec![Value::Integer(1)]), failure(code, "bad syntax")]),
        // RUN #2, still queued behind the failure -> IGNORED
        ScriptStep::reply(ignored()),
        // PULL #2, likewise -> IGNORED
        ScriptStep::reply(ignored()),
        // the single RESET/ack_failure this connection sends in reaction
        ScriptStep::reply(success(vec![])),
    ];
    tokio::spawn(async move {
        let mut server = server;
        run_script(&mut server, script).await;
    });

    let auth = AuthToken::basic("neo4j", "pw");
    let hello = HelloOptions { user_agent: "ua", auth: &auth, routing_context: None, database: None };
    let mut conn = Connection::connect(client, hello).await.unwrap();
    let adapter = *conn.adapter();

    let run1 = RunRequest {
        statement: "RETURN 1 AS n",
        parameters: IndexMap::new(),
        bookmarks: &[],
        tx_timeout: None,
        tx_metadata: None,
        mode: AccessMode::Read,
        database: None,
    };
    let run2 = RunRequest {
        statement: "RETURN 2 AS n",
        parameters: IndexMap::new(),
        bookmarks: &[],
        tx_timeout: None,
        tx_metadata: None,
        mode: AccessMode::Read,
        database: None,
    };

    let run1_observer = Recording::default();
    let pull1_observer = Recording::default();
    let run2_observer = Recording::default();
    let pull2_observer = Recording::default();

    conn.enqueue(adapter.run(&run1).unwrap(), Box::new(RecordingObserver(run1_observer.clone()))).unwrap();
    conn.enqueue(adapter.pull(None, None), Box::new(RecordingObserver(pull1_observer.clone()))).unwrap();
    conn.enqueue(adapter.run(&run2).unwrap(), Box::new(RecordingObserver(run2_observer.clone()))).unwrap();
    conn.enqueue(adapter.pull(None, None), Box::new(RecordingObserver(pull2_observer.clone()))).unwrap();
    conn.flush().await.unwrap();
    conn.drain_queue().await.unwrap();

    assert_eq!(run1_observer.calls(), vec!["on_completed".to_owned()]);
    assert_eq!(
        pull1_observer.calls(),
        vec!["on_next([Integer(1)])".to_owned(), format!("on_error({code})")]
    );
    assert_eq!(run2_observer.calls(), vec![format!("on_error({code})")]);
    assert_eq!(pull2_observer.calls(), vec![format!("on_error({code})")]);

    assert!(conn.is_open());
}
