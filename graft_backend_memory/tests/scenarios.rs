// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end scenarios against the in-memory host.

mod support;

use graft_backend_memory::{FaultPlan, MemoryHost, html};
use graft_core::clock::SteppedClock;
use graft_core::describe::{Node, NodeRef};
use graft_core::effect::EffectOp;
use graft_core::error::DescriptionError;
use graft_core::host::{HostError, HostHandle, HostOp};
use graft_core::lane::Lane;
use graft_core::reconciler::{Reconciler, RootId, WorkOutcome};
use graft_core::scheduler::{RootState, SchedulerConfig};
use graft_core::time::Duration;
use graft_core::unit::Key;

use support::{Harness, commits};

fn page(title: &str, body: &str) -> NodeRef {
    Node::element("div")
        .child(Node::element("h1").child(Node::text(title)))
        .child(Node::element("p").child(Node::text(body)))
        .build()
}

fn list(keys: &[u64]) -> NodeRef {
    Node::element("ul")
        .children(
            keys.iter()
                .map(|&k| Node::element("li").key(k).child(Node::text(format!("{k}")))),
        )
        .build()
}

/// Every host handle under `handle`, in pre-order.
fn handles(host: &MemoryHost, handle: HostHandle) -> Vec<HostHandle> {
    let mut out = Vec::new();
    let mut stack = vec![handle];
    while let Some(h) = stack.pop() {
        out.push(h);
        if let Some(node) = host.node(h) {
            stack.extend(node.children().iter().rev());
        }
    }
    out
}

fn until_commit<S>(rec: &mut Reconciler, source: &mut S, host: &mut MemoryHost, clock: &mut SteppedClock) -> Lane
where
    S: FnMut(RootId, Lane) -> NodeRef,
{
    loop {
        match rec.work(source, host, clock) {
            WorkOutcome::Committed(report) => return report.lane,
            WorkOutcome::Yielded { .. } => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

#[test]
fn text_updates_keep_host_handles() {
    let mut harness = Harness::unbounded();
    harness.render(&page("Hello", "Welcome"), Lane::Urgent);
    let before = handles(&harness.host, harness.host.container());

    let next = page("Hello World!", "Updated paragraph");
    let report = harness.render(&next, Lane::Urgent);
    let counts = report.counts();
    assert_eq!(counts.text_updates, 2, "h1 and p text change");
    assert_eq!(counts.total(), 2, "nothing structural");
    assert!(report.is_clean(), "no errors");
    harness.assert_shows(&next);
    assert_eq!(
        handles(&harness.host, harness.host.container()),
        before,
        "same host nodes in the same places"
    );
}

#[test]
fn keyed_rotation_moves_the_last_item() {
    let mut harness = Harness::unbounded();
    harness.render(&list(&[1, 2, 3]), Lane::Urgent);
    let ul = harness.host.node(harness.host.container()).unwrap().children()[0];
    let last = harness.host.node(ul).unwrap().children()[2];

    let next = list(&[3, 1, 2]);
    let report = harness.render(&next, Lane::Urgent);
    let moves: Vec<_> = report
        .applied
        .iter()
        .filter(|r| r.op == EffectOp::Move)
        .collect();
    assert_eq!(moves.len(), 1, "one move");
    assert_eq!(moves[0].handle, Some(last), "item 3 moves to the front");
    assert_eq!(report.counts().total(), 1, "only the move");
    harness.assert_shows(&next);
}

#[test]
fn root_kind_change_replaces_the_subtree() {
    let header = || Node::composite("Header").child(Node::element("h1").child(Node::text("Hi")));
    let mut harness = Harness::unbounded();
    harness.render(&Node::element("div").child(header()).build(), Lane::Urgent);

    let next = Node::element("section").child(header()).build();
    let report = harness.render(&next, Lane::Urgent);
    let counts = report.counts();
    assert_eq!(counts.removes, 1, "old div removed as one subtree");
    assert_eq!(counts.inserts, 3, "section, h1 and text inserted");
    assert_eq!(harness.host.released(), 3, "div, h1 and text released");
    assert_eq!(harness.host.live_nodes(), 3, "only the new subtree is alive");
    harness.assert_shows(&next);
}

#[test]
fn urgent_update_commits_without_background_effects() {
    let config = SchedulerConfig {
        slice_budget: Duration(2),
        max_background_preemptions: 3,
    };
    let mut rec = Reconciler::new(config);
    let mut host = MemoryHost::new();
    let mut clock = SteppedClock::new(Duration(1));
    let root = rec.mount(host.container());
    let urgent = page("urgent", "now");
    let background = list(&[1, 2, 3, 4, 5, 6]);
    let mut source = |_: RootId, lane: Lane| match lane {
        Lane::Urgent => urgent.clone(),
        Lane::Background => background.clone(),
    };

    rec.request_update(root, Lane::Background).unwrap();
    assert!(
        matches!(
            rec.work(&mut source, &mut host, &mut clock),
            WorkOutcome::Yielded {
                lane: Lane::Background,
                ..
            }
        ),
        "background pass yields mid-walk"
    );
    assert_eq!(host.calls(), 0, "rendering never touches the host");

    rec.request_update(root, Lane::Urgent).unwrap();
    assert_eq!(until_commit(&mut rec, &mut source, &mut host, &mut clock), Lane::Urgent);
    assert_eq!(host.html(host.container()), html::describe(&urgent));
    assert_eq!(host.live_nodes(), 5, "no background nodes were created");

    let rest = commits(rec.run_until_idle(&mut source, &mut host, &mut clock));
    assert_eq!(rest.len(), 1, "background retried once");
    assert_eq!(rest[0].lane, Lane::Background);
    assert_eq!(host.html(host.container()), html::describe(&background));
}

#[test]
fn background_request_waits_for_urgent_pass() {
    let config = SchedulerConfig {
        slice_budget: Duration(2),
        max_background_preemptions: 3,
    };
    let mut rec = Reconciler::new(config);
    let mut host = MemoryHost::new();
    let mut clock = SteppedClock::new(Duration(1));
    let root = rec.mount(host.container());
    let urgent = page("urgent", "now");
    let background = list(&[1, 2, 3]);
    let mut source = |_: RootId, lane: Lane| match lane {
        Lane::Urgent => urgent.clone(),
        Lane::Background => background.clone(),
    };

    rec.request_update(root, Lane::Urgent).unwrap();
    assert!(
        matches!(
            rec.work(&mut source, &mut host, &mut clock),
            WorkOutcome::Yielded {
                lane: Lane::Urgent,
                ..
            }
        ),
        "urgent pass yields mid-walk"
    );
    rec.request_update(root, Lane::Background).unwrap();

    let order: Vec<_> = commits(rec.run_until_idle(&mut source, &mut host, &mut clock))
        .into_iter()
        .map(|r| (r.lane, r.pass))
        .collect();
    assert_eq!(
        order,
        [(Lane::Urgent, 0), (Lane::Background, 1)],
        "the in-flight urgent pass is kept and commits first"
    );
    assert_eq!(host.html(host.container()), html::describe(&background));
    assert_eq!(rec.state(root), Some(RootState::Idle));
}

#[test]
fn background_is_protected_after_repeated_preemption() {
    let config = SchedulerConfig {
        slice_budget: Duration(2),
        max_background_preemptions: 2,
    };
    let mut rec = Reconciler::new(config);
    let mut host = MemoryHost::new();
    let mut clock = SteppedClock::new(Duration(1));
    let root = rec.mount(host.container());
    let keys: Vec<u64> = (0..20).collect();
    let mut source = |_: RootId, lane: Lane| match lane {
        Lane::Urgent => page("urgent", "now"),
        Lane::Background => list(&keys),
    };

    rec.request_update(root, Lane::Background).unwrap();
    let mut lanes = Vec::new();
    for _ in 0..3 {
        assert!(
            matches!(
                rec.work(&mut source, &mut host, &mut clock),
                WorkOutcome::Yielded {
                    lane: Lane::Background,
                    ..
                }
            ),
            "background pass is in flight"
        );
        rec.request_update(root, Lane::Urgent).unwrap();
        lanes.push(until_commit(&mut rec, &mut source, &mut host, &mut clock));
    }
    lanes.extend(
        commits(rec.run_until_idle(&mut source, &mut host, &mut clock))
            .into_iter()
            .map(|r| r.lane),
    );
    assert_eq!(
        lanes,
        [Lane::Urgent, Lane::Urgent, Lane::Background, Lane::Urgent],
        "third background pass finishes despite an urgent request"
    );
    assert_eq!(rec.state(root), Some(RootState::Idle));
}

#[test]
fn rejected_insert_skips_its_subtree_and_heals_later() {
    let host = MemoryHost::new().with_faults(FaultPlan::none().fail_nth_call(3));
    let mut harness = Harness::with(host, SchedulerConfig::default(), SteppedClock::frozen());
    let desc = Node::element("div")
        .child(Node::element("p").child(Node::text("x")))
        .child(Node::element("span").child(Node::text("y")))
        .build();

    // Calls: create div, insert div, create p (rejected).
    let report = harness.render(&desc, Lane::Urgent);
    assert_eq!(report.failed.len(), 1, "the p insert failed");
    assert!(
        matches!(report.failed[0].error, HostError::Backend(_)),
        "injected failure is reported"
    );
    assert_eq!(report.skipped.len(), 1, "the text inside p was skipped");
    assert_eq!(report.applied.len(), 3, "div, span and y were inserted");
    assert_eq!(report.errors().count(), 1);
    assert!(!report.is_clean());
    assert_eq!(harness.html(), "<div><span>y</span></div>");

    // The same description retries the missing subtree in place.
    let retry = harness.render(&desc, Lane::Urgent);
    assert!(retry.is_clean(), "nothing fails the second time");
    assert_eq!(retry.counts().inserts, 2, "p and its text");
    assert_eq!(retry.counts().total(), 2);
    harness.assert_shows(&desc);
}

#[test]
fn rejected_text_update_keeps_old_text() {
    let mut harness = Harness::unbounded();
    harness.render(&Node::element("p").child(Node::text("a")).build(), Lane::Urgent);
    let p = harness.host.node(harness.host.container()).unwrap().children()[0];
    let text = harness.host.node(p).unwrap().children()[0];
    harness.host.set_faults(FaultPlan::none().fail_handle(text));

    let report = harness.render(&Node::element("p").child(Node::text("b")).build(), Lane::Urgent);
    assert_eq!(report.failed.len(), 1);
    assert!(
        matches!(report.failed[0].record.op, EffectOp::SetText(_)),
        "the set-text was rejected"
    );
    assert_eq!(harness.host.text(text), Some("a"), "host keeps the old text");

    harness.host.set_faults(FaultPlan::none());
    let next = Node::element("p").child(Node::text("c")).build();
    let report = harness.render(&next, Lane::Urgent);
    assert!(report.is_clean());
    harness.assert_shows(&next);
}

#[test]
fn rejected_op_kind_is_contained_per_unit() {
    let mut harness = Harness::unbounded();
    let first = Node::element("div")
        .child(Node::element("a").attr("href", "/one"))
        .child(Node::text("t"))
        .build();
    harness.render(&first, Lane::Urgent);
    harness
        .host
        .set_faults(FaultPlan::none().fail_op(HostOp::UpdateAttributes));

    let report = harness.render(
        &Node::element("div")
            .child(Node::element("a").attr("href", "/two"))
            .child(Node::text("u"))
            .build(),
        Lane::Urgent,
    );
    assert_eq!(report.failed.len(), 1, "attribute update rejected");
    assert_eq!(report.counts().text_updates, 1, "sibling text still applied");
    assert_eq!(harness.html(), r#"<div><a href="/one"></a>u</div>"#);
}

#[test]
fn duplicate_keys_fall_back_to_positions() {
    let mut harness = Harness::unbounded();
    harness.render(&list(&[1, 2]), Lane::Urgent);
    let next = list(&[1, 1, 2]);
    let report = harness.render(&next, Lane::Urgent);
    assert_eq!(report.description_errors.len(), 1);
    assert!(
        matches!(
            &report.description_errors[0],
            DescriptionError::DuplicateKey { key, .. } if *key == Key::from(1_u64)
        ),
        "the repeated key is named"
    );
    harness.assert_shows(&next);
}

#[test]
fn unmount_releases_every_host_node() {
    let mut harness = Harness::unbounded();
    harness.render(
        &Node::element("div")
            .child(Node::element("p").child(Node::text("x")))
            .child(Node::element("span"))
            .build(),
        Lane::Urgent,
    );
    assert_eq!(harness.host.live_nodes(), 4);

    let report = harness.rec.unmount(harness.root, &mut harness.host).unwrap();
    assert_eq!(report.counts().removes, 1, "one top-level node");
    assert_eq!(report.lane, Lane::Urgent);
    assert_eq!(harness.html(), "");
    assert_eq!(harness.host.live_nodes(), 0);
    assert_eq!(harness.host.released(), 4);
    assert_eq!(harness.rec.roots().count(), 0);
}

#[test]
fn roots_render_into_their_own_containers() {
    let mut host = MemoryHost::new();
    let second = host.add_container();
    let mut rec = Reconciler::default();
    let a = rec.mount(host.container());
    let b = rec.mount(second);
    let mut source = |root: RootId, _: Lane| {
        Node::element("h1")
            .child(Node::text(format!("root {}", root.0)))
            .build()
    };

    rec.request_update(a, Lane::Background).unwrap();
    rec.request_update(b, Lane::Background).unwrap();
    let reports = commits(rec.run_until_idle(&mut source, &mut host, &mut SteppedClock::frozen()));
    let roots: Vec<RootId> = reports.iter().map(|r| r.root).collect();
    assert_eq!(roots, [a, b], "equal lanes run in mount order");
    assert_eq!(host.html(host.container()), "<h1>root 0</h1>");
    assert_eq!(host.html(second), "<h1>root 1</h1>");

    rec.unmount(a, &mut host).unwrap();
    assert_eq!(host.html(host.container()), "");
    assert_eq!(host.html(second), "<h1>root 1</h1>", "other root untouched");
    assert_eq!(rec.roots().collect::<Vec<_>>(), [b]);
}
