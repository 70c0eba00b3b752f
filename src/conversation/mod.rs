pub mod client;

use crate::models::api::ChatRequest;
use crate::models::chat::{ Message, MessageContent };
use self::client::{ AgentClient, ClientError };
use log::{ debug, info, warn };
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const WELCOME_MESSAGE: &str =
    "Hi! I can answer questions about the California housing dataset. Ask me for figures, comparisons, or a chart.";

pub const SUGGESTIONS: &[&str] = &[
    "What is the average house value by ocean proximity?",
    "Show me a bar chart of median income by ocean proximity",
    "Which areas have the oldest housing?",
    "Show the distribution of households as a pie chart",
];

/// The single active conversation. Only the transitions below change it.
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
    loading: bool,
    first_visit: bool,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::agent(WELCOME_MESSAGE)],
            loading: false,
            first_visit: true,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_first_visit(&self) -> bool {
        self.first_visit
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn reset(&mut self) {
        self.messages = vec![Message::agent(WELCOME_MESSAGE)];
        self.loading = false;
        self.first_visit = false;
    }

    fn mark_visited(&mut self) {
        self.first_visit = false;
    }
}

/// A request issued by `begin_send`, handed back to `complete` once the
/// outbound call resolves.
#[derive(Debug)]
pub struct PendingRequest {
    pub id: Uuid,
    pub request: ChatRequest,
    pub token: CancellationToken,
}

#[derive(Debug)]
struct InFlight {
    id: Uuid,
    token: CancellationToken,
}

#[derive(Debug, Default)]
pub struct ConversationController {
    state: ConversationState,
    in_flight: Option<InFlight>,
}

impl ConversationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Appends the user message and opens a request. Returns `None` when the
    /// trimmed input is empty or a request is already outstanding.
    pub fn begin_send(&mut self, input: &str) -> Option<PendingRequest> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        if self.in_flight.is_some() {
            debug!("Ignoring send while a request is in flight");
            return None;
        }

        self.state.append(Message::user(text));
        self.state.set_loading(true);
        self.state.mark_visited();

        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        self.in_flight = Some(InFlight { id, token: token.clone() });

        Some(PendingRequest {
            id,
            request: ChatRequest { message: text.to_string() },
            token,
        })
    }

    /// Cancels the outstanding request, if any. Its eventual completion is
    /// dropped without touching the message list.
    pub fn cancel(&mut self) -> bool {
        match self.in_flight.take() {
            Some(in_flight) => {
                info!("Cancelling in-flight request {}", in_flight.id);
                in_flight.token.cancel();
                self.state.set_loading(false);
                true
            }
            None => false,
        }
    }

    /// Records the outcome of `pending`. Appends exactly one agent message
    /// unless the request was cancelled or is no longer current.
    pub fn complete(
        &mut self,
        pending: PendingRequest,
        outcome: Result<MessageContent, ClientError>
    ) -> Option<&Message> {
        let current = self.in_flight
            .as_ref()
            .map(|in_flight| in_flight.id == pending.id)
            .unwrap_or(false);
        if !current {
            debug!("Dropping stale completion for request {}", pending.id);
            return None;
        }

        self.in_flight = None;
        self.state.set_loading(false);
        if pending.token.is_cancelled() {
            debug!("Dropping completion for cancelled request {}", pending.id);
            return None;
        }

        let content = match outcome {
            Ok(content) => content,
            Err(ClientError::Cancelled) => {
                return None;
            }
            Err(e) => {
                warn!("Chat request failed: {}", e);
                MessageContent::Text(format!("Error: {}", e))
            }
        };

        self.state.append(Message::agent(content));
        self.state.last_message()
    }

    /// Sends without offering a cancellation point to the caller.
    pub async fn send<C: AgentClient + ?Sized>(
        &mut self,
        client: &C,
        input: &str
    ) -> Option<&Message> {
        let pending = self.begin_send(input)?;
        let outcome = client.send(&pending.request, pending.token.clone()).await;
        self.complete(pending, outcome)
    }

    pub fn reset(&mut self) {
        self.cancel();
        self.state.reset();
    }
}
