//! spec.md §8 S5: seed routers `[a, b]`; `a` refuses the connection; `b`
//! answers the pre-4.3 routing query with one row. The refreshed table
//! ends up with routers `{b, c}`, readers `{c, d}`, writers `{e}` — `a`
//! is dropped only because the table is replaced wholesale on success,
//! never via `forget_router` (spec.md §9's adopted open question: a bare
//! connection failure only touches readers/writers, see
//! [`bolt_routing::RoutingTable::forget`]).

use async_trait::async_trait;
use bolt_connection::{AuthToken, Connection, ConnectionError, HelloOptions};
use bolt_packstream::{Structure, Value};
use bolt_routing::{Address, Connector, IdentityResolver, Rediscovery, RoutingError, RoutingTable};
use bolt_test_utils::{duplex_pair, run_fake_server, DuplexChannel, ScriptStep};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn success(fields: Vec<(&str, Value)>) -> Value {
    let map: IndexMap<String, Value> = fields.into_iter().map(|(k, v)| (k.to_owned(), v)).collect();
    Value::Structure(Structure::new(0x70, vec![Value::Map(map)]))
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

/// `a` refuses the connection outright; `b` answers the V4.0 routing
/// query with a single row. Records which addresses were attempted, in
/// order, so the test can confirm `a` was tried before `b`.
struct FlakyFirstSeedConnector {
    attempted: Mutex<Vec<String>>,
}

#[async_trait]
impl Connector<DuplexChannel> for FlakyFirstSeedConnector {
    async fn connect(&self, address: &Address) -> Result<Connection<DuplexChannel>, RoutingError> {
        self.attempted.lock().unwrap().push(address.host.clone());
        if address.host == "a" {
            return Err(RoutingError::Connection(ConnectionError::Channel("connection refused".to_owned())));
        }

        let (client, server) = duplex_pair();
        let reply = u32::from_be_bytes([0, 0, 0, 4]);
        let script = vec![
            ScriptStep::reply(success(vec![])),
            ScriptStep::reply(success(vec![("fields", Value::from(vec!["ttl", "servers"]))])),
            ScriptStep::replies(vec![
                record(vec![
                    Value::Integer(300),
                    servers(vec![
                        ("ROUTE", vec!["b:7687", "c:7687"]),
                        ("READ", vec!["c:7687", "d:7687"]),
                        ("WRITE", vec!["e:7687"]),
                    ]),
                ]),
                success(vec![]),
            ]),
        ];
        tokio::spawn(run_fake_server(server, reply, script));
        let auth = AuthToken::basic("neo4j", "pw");
        let hello = HelloOptions { user_agent: "bolt-driver/0.1", auth: &auth, routing_context: None, database: None };
        Connection::connect(client, hello).await.map_err(RoutingError::from)
    }
}

#[tokio::test]
async fn refresh_falls_through_a_refused_seed_to_the_next_one() {
    let connector = Arc::new(FlakyFirstSeedConnector { attempted: Mutex::new(Vec::new()) });
    let rediscovery = Rediscovery::new(connector.clone(), Arc::new(IdentityResolver));

    let mut table =
        RoutingTable::new(vec![Address::new("a", 7687), Address::new("b", 7687)], vec![], vec![], Duration::ZERO);

    rediscovery.refresh(&mut table, &[], &IndexMap::new(), None).await.unwrap();

    assert_eq!(connector.attempted.lock().unwrap().as_slice(), &["a".to_owned(), "b".to_owned()]);
    assert_eq!(table.routers(), &[Address::new("b", 7687), Address::new("c", 7687)]);
    assert_eq!(table.readers(), &[Address::new("c", 7687), Address::new("d", 7687)]);
    assert_eq!(table.writers(), &[Address::new("e", 7687)]);
    assert!(!table.is_stale_for(bolt_connection::AccessMode::Read));
    assert!(!table.is_stale_for(bolt_connection::AccessMode::Write));
}
