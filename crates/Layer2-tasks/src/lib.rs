//! # codepad-tasks
//!
//! Client for the Codepad task service.
//!
//! ## Operations
//!
//! | Method        | HTTP                  |
//! |---------------|-----------------------|
//! | `list_tasks`  | `GET /tasks`          |
//! | `get_task`    | `GET /tasks/{id}`     |
//! | `create_task` | `POST /tasks`         |
//! | `update_task` | `PUT /tasks/{id}`     |
//! | `delete_task` | `DELETE /tasks/{id}`  |

pub mod client;
pub mod error;
pub mod task;

pub use client::TaskClient;
pub use error::TaskClientError;
pub use task::{Task, TaskId};
