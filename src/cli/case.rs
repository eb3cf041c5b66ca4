use std::sync::Arc;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::cases::models::{Debrief, Message, Role};
use crate::cases::{CaseSession, StartCaseOptions};
use crate::client::ApiClient;

const HELP: &str = "Commands: /debrief to finish the case, /reset to abandon it, /quit to exit";

fn print_message(msg: &Message) {
    let who = match msg.role {
        Role::Learner => "you",
        Role::Tutor => "echo",
    };
    if msg.failed {
        println!("[{}] {} (not delivered)", who, msg.content);
    } else {
        println!("[{}] {}", who, msg.content);
    }
}

fn print_debrief(debrief: &Debrief) {
    println!("\n== Debrief ==\n{}", debrief.summary);
    let sections = [
        ("Strengths", &debrief.strengths),
        ("Areas for improvement", &debrief.areas_for_improvement),
        ("Missed", &debrief.missed_items),
        ("Teaching points", &debrief.teaching_points),
        ("Resources", &debrief.follow_up_resources),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        println!("\n{}:", title);
        for item in items {
            println!("  - {}", item);
        }
    }
}

/// Interactive case loop. Starts a new case from `options` or resumes
/// `session_id`.
pub async fn run(
    client: Arc<ApiClient>,
    options: Option<StartCaseOptions>,
    session_id: Option<String>,
) -> Result<()> {
    let session = CaseSession::new(client);

    if let Some(id) = session_id {
        session.resume_case(&id).await?;
    } else {
        session.start_case(options.unwrap_or_default()).await?;
    }

    for msg in session.messages().iter() {
        print_message(msg);
    }
    println!("{}", HELP);

    let mut rl = DefaultEditor::new()?;
    loop {
        let phase = session
            .case_state()
            .map(|c| c.phase.to_string())
            .unwrap_or_default();
        let readline = rl.readline(&format!("{}> ", phase));
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                match line {
                    "/quit" => break,
                    "/reset" => {
                        session.reset_case();
                        println!("Case abandoned.");
                        break;
                    }
                    "/debrief" => {
                        if let Err(e) = session.end_case().await {
                            println!("Error: {}", e);
                            session.clear_error();
                            continue;
                        }
                        if let Some(last) = session.messages().last() {
                            print_message(last);
                        }
                        if let Some(debrief) = session.debrief() {
                            print_debrief(&debrief);
                        }
                        break;
                    }
                    "/help" => println!("{}", HELP),
                    text => {
                        if let Err(e) = session.send_message(text).await {
                            println!("Error: {}", e);
                            session.clear_error();
                            continue;
                        }
                        if let Some(last) = session.messages().last() {
                            print_message(last);
                        }
                        if let Some(moment) = session.teaching_moment() {
                            println!("  * {}", moment);
                        }
                        if session.case_state().is_some_and(|c| c.phase.is_complete()) {
                            println!("The case is complete. Type /debrief for feedback.");
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
