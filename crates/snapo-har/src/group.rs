//! Folds a flat `Vec<Record>` into per-id HTTP/WebSocket exchanges, the
//! intermediate shape the HAR entry builders consume.

use std::collections::HashMap;

use snapo_protocol::{
    Id, Record, RequestFailed, RequestWillBeSent, ResponseFinished, ResponseReceived,
    ResponseStreamClosed, ResponseStreamEvent, WebSocketCloseRequested, WebSocketFailed,
    WebSocketLifecycle, WebSocketMessage, WebSocketOpened,
};

#[derive(Debug, Default, Clone)]
pub struct HttpExchange {
    pub will_be_sent: Option<RequestWillBeSent>,
    pub response_received: Option<ResponseReceived>,
    pub stream_events: Vec<ResponseStreamEvent>,
    pub stream_closed: Option<ResponseStreamClosed>,
    pub failed: Option<RequestFailed>,
    pub finished: Option<ResponseFinished>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsMessageDirection {
    Send,
    Receive,
}

#[derive(Debug, Default, Clone)]
pub struct WsExchange {
    pub will_open: Option<WebSocketLifecycle>,
    pub opened: Option<WebSocketOpened>,
    pub messages: Vec<(WsMessageDirection, WebSocketMessage)>,
    pub close_requested: Vec<WebSocketCloseRequested>,
    pub closing: Option<WebSocketLifecycle>,
    pub closed: Option<WebSocketLifecycle>,
    pub failed: Option<WebSocketFailed>,
    pub cancelled: Option<WebSocketLifecycle>,
}

#[derive(Debug, Default, Clone)]
enum Exchange {
    #[default]
    Empty,
    Http(HttpExchange),
    Ws(WsExchange),
}

/// Groups `records` (in arbitrary but per-id-ordered input order, per the
/// spec's ordering invariant) into HTTP and WebSocket exchanges, each
/// ordered by the id's first appearance.
pub fn group(records: &[Record]) -> (Vec<HttpExchange>, Vec<WsExchange>) {
    let mut order: Vec<Id> = Vec::new();
    let mut by_id: HashMap<Id, Exchange> = HashMap::new();

    for record in records {
        let id = record.id();
        let slot = by_id.entry(id).or_insert_with(|| {
            order.push(id);
            Exchange::Empty
        });

        match record {
            Record::RequestWillBeSent(r) => {
                let ex = http_mut(slot);
                ex.will_be_sent = Some(r.clone());
            }
            Record::ResponseReceived(r) => http_mut(slot).response_received = Some(r.clone()),
            Record::ResponseStreamEvent(r) => http_mut(slot).stream_events.push(r.clone()),
            Record::ResponseStreamClosed(r) => http_mut(slot).stream_closed = Some(r.clone()),
            Record::RequestFailed(r) => http_mut(slot).failed = Some(r.clone()),
            Record::ResponseFinished(r) => http_mut(slot).finished = Some(r.clone()),
            Record::WebSocketWillOpen(l) => ws_mut(slot).will_open = Some(l.clone()),
            Record::WebSocketOpened(o) => ws_mut(slot).opened = Some(o.clone()),
            Record::WebSocketMessageSent(m) => {
                ws_mut(slot).messages.push((WsMessageDirection::Send, m.clone()))
            }
            Record::WebSocketMessageReceived(m) => ws_mut(slot)
                .messages
                .push((WsMessageDirection::Receive, m.clone())),
            Record::WebSocketCloseRequested(c) => ws_mut(slot).close_requested.push(c.clone()),
            Record::WebSocketClosing(l) => ws_mut(slot).closing = Some(l.clone()),
            Record::WebSocketClosed(l) => ws_mut(slot).closed = Some(l.clone()),
            Record::WebSocketFailed(f) => ws_mut(slot).failed = Some(f.clone()),
            Record::WebSocketCancelled(l) => ws_mut(slot).cancelled = Some(l.clone()),
        }
    }

    let mut http = Vec::new();
    let mut ws = Vec::new();
    for id in order {
        match by_id.remove(&id) {
            Some(Exchange::Http(ex)) => http.push(ex),
            Some(Exchange::Ws(ex)) => ws.push(ex),
            _ => {}
        }
    }
    (http, ws)
}

fn http_mut(slot: &mut Exchange) -> &mut HttpExchange {
    if matches!(slot, Exchange::Empty) {
        *slot = Exchange::Http(HttpExchange::default());
    }
    match slot {
        Exchange::Http(ex) => ex,
        _ => unreachable!("id already classified as a non-HTTP exchange"),
    }
}

fn ws_mut(slot: &mut Exchange) -> &mut WsExchange {
    if matches!(slot, Exchange::Empty) {
        *slot = Exchange::Ws(WsExchange::default());
    }
    match slot {
        Exchange::Ws(ex) => ex,
        _ => unreachable!("id already classified as a non-WebSocket exchange"),
    }
}
