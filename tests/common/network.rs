use std::sync::{
    mpsc::{self, Receiver, Sender, TryRecvError},
    Arc, Mutex,
};

use topichain::networking::{Network, TransportError};

/// A mock pub/sub stub which fans every published message out to the inboxes of all nodes
/// (including the publisher's own) using channels. Publications from a single thread reach every
/// inbox in publication order, which stands in for the ordering topic's total-order guarantee.
#[derive(Clone)]
pub(crate) struct PubSubStub {
    all_inboxes: Vec<Sender<(String, Vec<u8>)>>,
    inbox: Arc<Mutex<Receiver<(String, Vec<u8>)>>>,
}

impl Network for PubSubStub {
    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        for inbox in &self.all_inboxes {
            let _ = inbox.send((topic.to_string(), payload.clone()));
        }
        Ok(())
    }

    fn recv(&mut self) -> Option<(String, Vec<u8>)> {
        match self.inbox.lock().unwrap().try_recv() {
            Ok(t_m) => Some(t_m),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => panic!(),
        }
    }
}

pub(crate) fn mock_network(num_nodes: usize) -> Vec<PubSubStub> {
    let mut all_inboxes = Vec::new();
    let inboxes: Vec<Receiver<(String, Vec<u8>)>> = (0..num_nodes)
        .map(|_| {
            let (sender, receiver) = mpsc::channel();
            all_inboxes.push(sender);
            receiver
        })
        .collect();

    inboxes
        .into_iter()
        .map(|inbox| PubSubStub {
            all_inboxes: all_inboxes.clone(),
            inbox: Arc::new(Mutex::new(inbox)),
        })
        .collect()
}

/// A transport whose publish always fails. For exercising the proposal failure path.
#[derive(Clone)]
pub(crate) struct DeadEndNetwork;

impl Network for DeadEndNetwork {
    fn publish(&mut self, _topic: &str, _payload: Vec<u8>) -> Result<(), TransportError> {
        Err(TransportError("publish refused".to_string()))
    }

    fn recv(&mut self) -> Option<(String, Vec<u8>)> {
        None
    }
}
