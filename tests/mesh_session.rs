#![allow(clippy::unwrap_used, clippy::expect_used)]
mod common;

use std::{cell::RefCell, rc::Rc, time::Duration};

use common::{config, engine, fully_connected, pump_for, pump_until, room};
use meshrtc::{
    event_bus::{BusEvent, EventName},
    signaling::HostCommand,
};
use serde_json::json;

#[test]
fn three_participants_form_a_full_mesh() {
    let (connector, _server) = room();
    let (a, fa) = engine(&connector, config());
    let (b, fb) = engine(&connector, config());
    let (c, fc) = engine(&connector, config());
    let mut engines = [a, b, c];
    for (e, name) in engines.iter_mut().zip(["ann", "bob", "cy"]) {
        e.connect("standup", name).unwrap();
    }

    pump_until(&mut engines, "full mesh", |es| {
        es.iter().all(|e| fully_connected(e, 2))
    });

    let ids: Vec<String> = engines
        .iter()
        .map(|e| e.local_id().unwrap().to_owned())
        .collect();
    for (e, f) in engines.iter().zip([&fa, &fb, &fc]) {
        let me = e.local_id().unwrap();
        for other in ids.iter().filter(|id| *id != me) {
            assert_eq!(f.created_for(other), 1, "{me} -> {other}");
        }
        assert_eq!(e.roster().len(), 3);
        assert_eq!(e.remote_streams().len(), 2);
    }
}

#[test]
fn leaving_participant_is_dropped_by_the_rest() {
    let (connector, _server) = room();
    let (a, _) = engine(&connector, config());
    let (b, _) = engine(&connector, config());
    let (c, fc) = engine(&connector, config());
    let mut engines = [a, b, c];
    for (e, name) in engines.iter_mut().zip(["ann", "bob", "cy"]) {
        e.connect("standup", name).unwrap();
    }
    pump_until(&mut engines, "full mesh", |es| {
        es.iter().all(|e| fully_connected(e, 2))
    });

    let gone = engines[2].local_id().unwrap().to_owned();
    engines[2].disconnect();
    assert!(!engines[2].in_session());
    assert!(fc.all_closed());

    pump_until(&mut engines[..2], "the rest to drop the leaver", |es| {
        es.iter()
            .all(|e| fully_connected(e, 1) && e.peer(&gone).is_none() && e.roster().len() == 2)
    });
}

#[test]
fn simultaneous_offers_settle_on_one_connection() {
    let cfg = meshrtc::core::SessionConfig {
        offer_stagger_max: Duration::from_secs(60),
        ..config()
    };
    let (connector, _server) = room();
    let (a, fa) = engine(&connector, cfg.clone());
    let (b, fb) = engine(&connector, cfg);
    let mut engines = [a, b];
    engines[0].connect("standup", "ann").unwrap();
    engines[1].connect("standup", "bob").unwrap();
    pump_until(&mut engines, "both rosters", |es| {
        es.iter()
            .all(|e| e.local_id().is_some() && e.roster().len() == 2)
    });

    let id_a = engines[0].local_id().unwrap().to_owned();
    let id_b = engines[1].local_id().unwrap().to_owned();
    engines[0].make_offer(&id_b).unwrap();
    engines[1].make_offer(&id_a).unwrap();

    pump_until(&mut engines, "connected pair", |es| {
        es.iter().all(|e| fully_connected(e, 1))
    });
    pump_for(&mut engines, Duration::from_millis(50));
    assert!(engines.iter().all(|e| fully_connected(e, 1)));

    let (lower_factory, higher_factory, lower, higher) = if id_a < id_b {
        (&fa, &fb, &id_a, &id_b)
    } else {
        (&fb, &fa, &id_b, &id_a)
    };
    // The lower id keeps its offer; the higher one may have built a second
    // connection to answer it.
    assert_eq!(lower_factory.created_for(higher), 1);
    assert!(higher_factory.created_for(lower) <= 2);
}

#[test]
fn disconnect_right_after_connect_leaves_nothing_behind() {
    let (connector, _server) = room();
    let (a, fa) = engine(&connector, config());
    let (b, _) = engine(&connector, config());
    let mut engines = [a, b];
    engines[1].connect("standup", "bob").unwrap();
    pump_until(&mut engines, "bob joined", |es| es[1].local_id().is_some());

    engines[0].connect("standup", "ann").unwrap();
    engines[0].disconnect();

    pump_for(&mut engines, Duration::from_millis(100));
    pump_until(&mut engines, "bob alone", |es| {
        es[1].peer_ids().is_empty() && es[1].roster().len() == 1
    });
    assert!(!engines[0].in_session());
    assert!(engines[0].peer_ids().is_empty());
    assert_eq!(fa.total(), 0);
}

#[test]
fn end_meeting_sends_everyone_else_home() {
    let (connector, _server) = room();
    let (a, _) = engine(&connector, config());
    let (b, _) = engine(&connector, config());
    let (c, _) = engine(&connector, config());
    let mut engines = [a, b, c];
    for (e, name) in engines.iter_mut().zip(["host", "bob", "cy"]) {
        e.connect("standup", name).unwrap();
    }
    pump_until(&mut engines, "full mesh", |es| {
        es.iter().all(|e| fully_connected(e, 2))
    });

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let _sub = engines[1].bus().on(EventName::HostCommand, move |ev| {
        if let BusEvent::HostCommand(cmd) = ev {
            log.borrow_mut().push(cmd.clone());
        }
    });

    assert!(engines[0].send_host_command(HostCommand::EndMeeting { from: None }));
    pump_until(&mut engines, "others to leave", |es| {
        !es[1].in_session() && !es[2].in_session()
    });

    let host = engines[0].local_id().unwrap().to_owned();
    assert_eq!(
        seen.borrow().as_slice(),
        &[HostCommand::EndMeeting { from: Some(host) }]
    );
    pump_until(&mut engines[..1], "host alone", |es| {
        es[0].peer_ids().is_empty() && es[0].roster().len() == 1
    });
    assert!(engines[0].in_session());
}

#[test]
fn chat_reaches_every_other_participant() {
    let (connector, _server) = room();
    let (a, _) = engine(&connector, config());
    let (b, _) = engine(&connector, config());
    let (c, _) = engine(&connector, config());
    let mut engines = [a, b, c];
    for (e, name) in engines.iter_mut().zip(["ann", "bob", "cy"]) {
        e.connect("standup", name).unwrap();
    }
    pump_until(&mut engines, "everyone joined", |es| {
        es.iter().all(|e| e.roster().len() == 3)
    });

    let inboxes: Vec<Rc<RefCell<Vec<serde_json::Value>>>> =
        (0..3).map(|_| Rc::new(RefCell::new(Vec::new()))).collect();
    let _subs: Vec<_> = engines
        .iter()
        .zip(&inboxes)
        .map(|(e, inbox)| {
            let inbox = inbox.clone();
            e.bus().on(EventName::ChatMessage, move |ev| {
                if let BusEvent::ChatMessage(v) = ev {
                    inbox.borrow_mut().push(v.clone());
                }
            })
        })
        .collect();

    let msg = json!({"from": "ann", "text": "morning"});
    assert!(engines[0].send_chat(msg.clone()));
    pump_until(&mut engines, "chat delivery", |_| {
        inboxes[1].borrow().len() == 1 && inboxes[2].borrow().len() == 1
    });
    assert_eq!(inboxes[1].borrow()[0], msg);
    assert!(inboxes[0].borrow().is_empty());
}
