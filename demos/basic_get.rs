//! A basic example demonstrating a GET request and JSON deserialization.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Todo {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    completed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The default instance already asks for JSON.
    let todo: Todo = rek::get("https://jsonplaceholder.typicode.com/todos/1", ())
        .await?
        .into_json()?;

    println!(
        "Todo #{id} for user #{user}: {title} (completed: {completed})",
        id = todo.id,
        user = todo.user_id,
        title = todo.title,
        completed = todo.completed
    );

    Ok(())
}
