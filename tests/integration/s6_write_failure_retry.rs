//! spec.md §8 S6: a commit fails with `Neo.ClientError.Cluster.NotALeader`;
//! the router forgets the writer and the retry executor re-invokes the
//! work function after a jittered delay, picking up a freshly-discovered
//! writer on the second attempt.
//!
//! Exercises [`bolt_routing::Router`] and [`bolt_driver::execute_with_retry`]
//! directly rather than the full [`bolt_driver::Driver`]/`Session` facade
//! (which hides the router behind a private seam) — the retry contract
//! this scenario cares about lives entirely in these two public pieces.

use async_trait::async_trait;
use bolt_connection::{
    AccessMode as ConnAccessMode, AuthToken, Connection, ConnectionError, Failure, HelloOptions,
};
use bolt_driver::{execute_with_retry, Error, RetryConfig};
use bolt_packstream::{Structure, Value};
use bolt_routing::{
    classify_error, Address, ConnectionPool, Connector, ErrorClass, IdentityResolver, Rediscovery, Router,
    RoutingError,
};
use bolt_test_utils::{duplex_pair, run_fake_server, DuplexChannel, ScriptStep};
use indexmap::IndexMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn success(fields: Vec<(&str, Value)>) -> Value {
    let map: IndexMap<String, Value> = fields.into_iter().map(|(k, v)| (k.to_owned(), v)).collect();
    Value::Structure(Structure::new(0x70, vec![Value::Map(map)]))
}

fn failure(code: &str, message: &str) -> Value {
    let mut map = IndexMap::new();
    map.insert("code".to_owned(), Value::String(code.to_owned()));
    map.insert("message".to_owned(), Value::String(message.to_owned()));
    Value::Structure(Structure::new(0x7F, vec![Value::Map(map)]))
}

fn record(values: Vec<Value>) -> Value {
    Value::Structure(Structure::new(0x71, vec![Value::List(values)]))
}

fn servers(entries: Vec<(&str, Vec<&str>)>) -> Value {
    Value::List(
        entries
            .into_iter()
            .map(|(role, addrs)| {
                Value::map(vec![
                    ("role".to_owned(), Value::String(role.to_owned())),
                    ("addresses".to_owned(), Value::List(addrs.into_iter().map(Value::from).collect())),
                ])
            })
            .collect(),
    )
}

/// `router` answers the pre-4.3 routing query, handing out writer `e1`
/// the first time and `e2` thereafter (simulating a leader election
/// between the first attempt and the retry). `e1` fails every `COMMIT`
/// with `NotALeader`; `e2` always succeeds.
struct ElectionConnector {
    refreshes: AtomicUsize,
}

#[async_trait]
impl Connector<DuplexChannel> for ElectionConnector {
    async fn connect(&self, address: &Address) -> Result<Connection<DuplexChannel>, RoutingError> {
        let (client, server) = duplex_pair();
        let reply = u32::from_be_bytes([0, 0, 0, 4]);

        let script = if address.host == "router" {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst);
            let writer = if n == 0 { "e1:7687" } else { "e2:7687" };
            vec![
                ScriptStep::reply(success(vec![])),
                ScriptStep::reply(success(vec![("fields", Value::from(vec!["ttl", "servers"]))])),
                ScriptStep::replies(vec![
                    record(vec![
                        Value::Integer(300),
                        servers(vec![
                            ("ROUTE", vec!["router:7687"]),
                            ("READ", vec!["router:7687"]),
                            ("WRITE", vec![writer]),
                        ]),
                    ]),
                    success(vec![]),
                ]),
            ]
        } else if address.host == "e1" {
            vec![
                ScriptStep::reply(success(vec![])),
                ScriptStep::reply(failure("Neo.ClientError.Cluster.NotALeader", "not the leader")),
            ]
        } else {
            vec![ScriptStep::reply(success(vec![])), ScriptStep::reply(success(vec![]))]
        };
        tokio::spawn(run_fake_server(server, reply, script));

        let auth = AuthToken::basic("neo4j", "pw");
        let hello = HelloOptions { user_agent: "bolt-driver/0.1", auth: &auth, routing_context: None, database: None };
        Connection::connect(client, hello).await.map_err(RoutingError::from)
    }
}

#[tokio::test(start_paused = true)]
async fn commit_retries_past_a_stale_leader_and_succeeds_against_the_refreshed_writer() {
    let connector = Arc::new(ElectionConnector { refreshes: AtomicUsize::new(0) });
    let pool = ConnectionPool::new(connector.clone(), 10, None);
    let rediscovery = Rediscovery::new(connector.clone(), Arc::new(IdentityResolver));
    let router =
        Arc::new(Router::new(pool, rediscovery, vec![Address::new("router", 7687)], IndexMap::new()));

    let attempts = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig { max_retry_time: Duration::from_secs(60), ..RetryConfig::default() };

    let result: Result<(), Error> = execute_with_retry(&config, || {
        let router = router.clone();
        let attempts = attempts.clone();
        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            let (address, mut conn) = router.acquire(ConnAccessMode::Write, None).await?;
            let adapter = *conn.adapter();
            let commit = adapter.commit();
            let mut outcome = Ok(());
            for req in commit {
                match conn.request(req.message).await {
                    Ok(_) => {}
                    Err(ConnectionError::Failure(f)) => {
                        outcome = Err(f);
                        break;
                    }
                    Err(e) => return Err(Error::from(e)),
                }
            }
            match outcome {
                Ok(()) => {
                    router.release(&address, conn).await;
                    Ok(())
                }
                Err(f) => {
                    conn.close().await;
                    let routing_err = RoutingError::Failure(f);
                    assert_eq!(classify_error(&routing_err), ErrorClass::WriteFailure);
                    router.forget(&address, "", &routing_err).await;
                    Err(Error::from(routing_err))
                }
            }
        }
    })
    .await;

    assert!(result.is_ok(), "commit should succeed once retried against the refreshed writer");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(connector.refreshes.load(Ordering::SeqCst), 2, "leader failure forces a second rediscovery");
}
