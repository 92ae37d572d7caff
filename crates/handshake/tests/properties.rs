//! Property tests: engine results against a reference BFS on random graphs.

use handshake::store::InMemoryConnectionStore;
use handshake::{CallContext, EngineConfig, PathOutcome, ReachabilityParams, TraversalEngine, UserId};
use petgraph::algo::dijkstra;
use petgraph::graph::{NodeIndex, UnGraph};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

fn name(i: usize) -> String {
    format!("n{i:02}")
}

/// A random simple graph as (node count, deduplicated canonical edges).
fn arb_graph() -> impl Strategy<Value = (usize, BTreeSet<(usize, usize)>)> {
    (2usize..14).prop_flat_map(|n| {
        let edges = prop::collection::vec((0..n, 0..n), 0..40).prop_map(|raw| {
            raw.into_iter()
                .filter(|(x, y)| x != y)
                .map(|(x, y)| (x.min(y), x.max(y)))
                .collect::<BTreeSet<_>>()
        });
        (Just(n), edges)
    })
}

struct Fixture {
    engine: TraversalEngine,
    reference: UnGraph<(), ()>,
    edges: BTreeSet<(usize, usize)>,
}

impl Fixture {
    async fn build(n: usize, edges: BTreeSet<(usize, usize)>) -> Self {
        let store = InMemoryConnectionStore::new(100);
        let now = chrono::Utc::now();
        for i in 0..n {
            store.add_user(name(i).into()).await.unwrap();
        }
        for &(x, y) in &edges {
            store.connect(name(x).into(), name(y).into(), now).await.unwrap();
        }

        let mut reference = UnGraph::<(), ()>::new_undirected();
        for _ in 0..n {
            reference.add_node(());
        }
        for &(x, y) in &edges {
            reference.add_edge(NodeIndex::new(x), NodeIndex::new(y), ());
        }

        let config = EngineConfig {
            batch_size: 3,
            ..EngineConfig::default()
        };
        let engine = TraversalEngine::new(Arc::new(store), config).unwrap();
        Self {
            engine,
            reference,
            edges,
        }
    }

    fn distances(&self, from: usize) -> HashMap<NodeIndex, u32> {
        dijkstra(&self.reference, NodeIndex::new(from), None, |_| 1u32)
    }

    fn connected(&self, x: &UserId, y: &UserId) -> bool {
        let index = |id: &UserId| id.as_str()[1..].parse::<usize>().unwrap();
        let (x, y) = (index(x), index(y));
        self.edges.contains(&(x.min(y), x.max(y)))
    }
}

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn reachability_reports_shortest_depths((n, edges) in arb_graph(), max_depth in 1u32..=6) {
        let (reported, expected) = block_on(async {
            let fixture = Fixture::build(n, edges).await;
            let reach = fixture
                .engine
                .reachability(
                    &CallContext::new(),
                    &name(0).into(),
                    &ReachabilityParams::new(max_depth, 10_000),
                )
                .await
                .unwrap();
            prop_assert!(!reach.truncated);

            let reported: Vec<(u32, String)> = reach
                .entries
                .iter()
                .map(|r| (r.depth, r.user_id.as_str().to_owned()))
                .collect();

            let mut expected: Vec<(u32, String)> = fixture
                .distances(0)
                .into_iter()
                .filter(|&(_, d)| d >= 1 && d <= max_depth)
                .map(|(node, d)| (d, name(node.index())))
                .collect();
            expected.sort();
            Ok::<_, TestCaseError>((reported, expected))
        })?;

        prop_assert_eq!(reported, expected);
    }

    #[test]
    fn shortest_path_is_optimal((n, edges) in arb_graph(), target in 0usize..14, max_depth in 1u32..=6) {
        let target = target % n;
        block_on(async {
            let fixture = Fixture::build(n, edges).await;
            let outcome = fixture
                .engine
                .shortest_path(&CallContext::new(), &name(0).into(), &name(target).into(), max_depth)
                .await
                .unwrap();

            let distance = fixture.distances(0).get(&NodeIndex::new(target)).copied();
            match (distance, outcome) {
                (Some(d), PathOutcome::Found(path)) => {
                    prop_assert!(d <= max_depth || d == 0);
                    prop_assert_eq!(path.len() as u32, d + 1);
                    prop_assert_eq!(path.first().unwrap().as_str(), name(0));
                    prop_assert_eq!(path.last().unwrap().as_str(), name(target));
                    for hop in path.windows(2) {
                        prop_assert!(fixture.connected(&hop[0], &hop[1]));
                    }
                }
                (Some(d), PathOutcome::NotFound) => prop_assert!(d > max_depth),
                (None, outcome) => prop_assert_eq!(outcome, PathOutcome::NotFound),
            }
            Ok::<_, TestCaseError>(())
        })?;
    }

    #[test]
    fn slice_is_the_induced_subgraph((n, edges) in arb_graph(), depth in 1u32..=3) {
        block_on(async {
            let fixture = Fixture::build(n, edges).await;
            let slice = fixture
                .engine
                .slice(&CallContext::new(), &name(0).into(), depth)
                .await
                .unwrap();

            let members: BTreeSet<&str> = slice.nodes.iter().map(|node| node.id.as_str()).collect();
            let expected: Vec<(String, String)> = fixture
                .edges
                .iter()
                .map(|&(x, y)| (name(x), name(y)))
                .filter(|(x, y)| members.contains(x.as_str()) && members.contains(y.as_str()))
                .collect();
            let actual: Vec<(String, String)> = slice
                .edges
                .iter()
                .map(|e| (e.from.as_str().to_owned(), e.to.as_str().to_owned()))
                .collect();

            prop_assert_eq!(actual, expected);
            Ok::<_, TestCaseError>(())
        })?;
    }
}
