use tracing::debug;

use crate::protocol::{Request, Response};
use crate::storage::dictionary::normalize_word;
use crate::storage::{Store, StoreError};

/// What the session should do with a dispatched request.
pub enum Outcome {
    Reply(Response),
    /// EXIT was served: reply, then signal shutdown and close the connection.
    Shutdown(Response),
}

/// Decodes one request line, validates it, and runs it against the store.
/// Validation failures never touch the store; a line that is not valid JSON
/// is answered with an error rather than dropping the connection.
pub fn dispatch(store: &Store, line: &str) -> Outcome {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            debug!("Malformed request: {}", e);
            return Outcome::Reply(Response::error("Malformed request."));
        }
    };

    let command = request.command.trim().to_uppercase();
    match command.as_str() {
        "" => Outcome::Reply(Response::error("A command is required.")),
        "SEARCH" => Outcome::Reply(search(store, &request)),
        "ADD" => Outcome::Reply(add(store, &request)),
        "REMOVE" => Outcome::Reply(remove(store, &request)),
        "APPEND" => Outcome::Reply(append(store, &request)),
        "UPDATE" => Outcome::Reply(update(store, &request)),
        "EXIT" => Outcome::Shutdown(Response::success("Server shutting down.")),
        other => Outcome::Reply(Response::error(format!("Unknown command: {}.", other))),
    }
}

fn search(store: &Store, request: &Request) -> Response {
    let Some(word) = field(&request.word) else {
        return Response::error("A word is required.");
    };
    match store.lookup(word) {
        Ok(meanings) => {
            let joined = meanings
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("; ");
            Response::success(format!("{}: {}", normalize_word(word), joined))
        }
        Err(e) => Response::error(error_text(e)),
    }
}

fn add(store: &Store, request: &Request) -> Response {
    let (Some(word), Some(meaning)) = (field(&request.word), field(&request.meaning)) else {
        return Response::error("A word and meaning are required.");
    };
    match store.insert(word, meaning) {
        Ok(()) => Response::success("Word added."),
        Err(e) => Response::error(error_text(e)),
    }
}

fn remove(store: &Store, request: &Request) -> Response {
    let Some(word) = field(&request.word) else {
        return Response::error("A word is required.");
    };
    match store.remove(word) {
        Ok(()) => Response::success("Word removed."),
        Err(e) => Response::error(error_text(e)),
    }
}

fn append(store: &Store, request: &Request) -> Response {
    let (Some(word), Some(meaning)) = (field(&request.word), field(&request.meaning)) else {
        return Response::error("A word and meaning are required.");
    };
    match store.add_meaning(word, meaning) {
        Ok(()) => Response::success("Meaning added."),
        Err(e) => Response::error(error_text(e)),
    }
}

fn update(store: &Store, request: &Request) -> Response {
    let (Some(word), Some(old_meaning), Some(new_meaning)) = (
        field(&request.word),
        field(&request.ex_meaning),
        field(&request.new_meaning),
    ) else {
        return Response::error("A word, existing meaning, and new meaning are required.");
    };
    match store.update_meaning(word, old_meaning, new_meaning) {
        Ok(()) => Response::success("Meaning updated."),
        Err(e) => Response::error(error_text(e)),
    }
}

fn field(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn error_text(err: StoreError) -> &'static str {
    match err {
        StoreError::InvalidInput => "Invalid word or meaning.",
        StoreError::WordExists => "Word already exists.",
        StoreError::WordNotFound => "Word not found.",
        StoreError::MeaningExists => "Meaning already exists.",
        StoreError::MeaningNotFound => "Meaning not found.",
    }
}
