//! spec.md §8 S2: an auto-commit `RETURN 1 AS n` through [`Driver`] end to
//! end — HELLO, then a pipelined `RUN`+`PULL` (spec.md §4.G), against a
//! real loopback socket.

use bolt_driver::{AuthToken, Driver, Value};
use bolt_packstream::Structure;
use bolt_test_utils::{perform_handshake, run_script, RawTcpChannel, ScriptStep};
use indexmap::IndexMap;
use tokio::net::TcpListener;

fn success(fields: Vec<(&str, Value)>) -> Value {
    let map: IndexMap<String, Value> = fields.into_iter().map(|(k, v)| (k.to_owned(), v)).collect();
    Value::Structure(Structure::new(0x70, vec![Value::Map(map)]))
}

fn record(values: Vec<Value>) -> Value {
    Value::Structure(Structure::new(0x71, vec![Value::List(values)]))
}

#[tokio::test]
async fn auto_commit_query_returns_its_single_record() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut channel = RawTcpChannel::new(stream);
        // reply V4.0
        assert!(perform_handshake(&mut channel, u32::from_be_bytes([0, 0, 0, 4])).await);

        let script = vec![
            // HELLO
            ScriptStep::reply(success(vec![("server", Value::String("fake/1.0".into()))])),
            // RUN
            ScriptStep::reply(success(vec![(
                "fields",
                Value::List(vec![Value::String("n".into())]),
            )])),
            // PULL
            ScriptStep::replies(vec![record(vec![Value::Integer(1)]), success(vec![])]),
        ];
        run_script(&mut channel, script).await;
    });

    let url = format!("bolt://127.0.0.1:{}", addr.port());
    let driver = Driver::connect(&url, AuthToken::basic("neo4j", "pw")).await.unwrap();

    let mut session = driver.session(bolt_driver::AccessMode::Read, None);
    let stream = session.run("RETURN 1 AS n", IndexMap::new()).await.unwrap();

    assert_eq!(stream.keys(), &["n".to_owned()]);
    let records: Vec<_> = stream.collect();
    assert_eq!(records, vec![vec![Value::Integer(1)]]);

    session.close().await;
    server.await.unwrap();
}
