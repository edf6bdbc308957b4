//! `mentora quiz`: answer the questions attached to a skill-tree node

use super::tree::read_tree;
use anyhow::{Context, Result};
use mentora_core::service::quiz::{QuizResults, QuizSession, QuizStep};
use mentora_core::{SkillTree, SkillTreeStore};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub async fn run(
    store: &SkillTreeStore,
    input: Option<&Path>,
    goal: Option<&str>,
    node_id: &str,
) -> Result<()> {
    let tree: SkillTree = match (input, goal) {
        (Some(path), _) => read_tree(path)?,
        (None, Some(goal)) => store
            .load_goal(goal)
            .await?
            .with_context(|| format!("No stored skill tree for goal '{}'", goal))?,
        (None, None) => anyhow::bail!("Provide a tree file or --goal"),
    };
    let node = tree
        .node(node_id)
        .with_context(|| format!("Node '{}' not found in '{}'", node_id, tree.title))?;

    let mut quiz = QuizSession::new(node.data.quiz_questions.clone());
    println!("Quiz: {}", node.data.topic);
    if quiz.is_empty() {
        println!("No quiz questions available for this topic yet.");
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(results) = ask_all(&mut quiz, &mut lines).await? else {
            return Ok(());
        };
        print_results(&results);

        eprint!("Try again? [y/N] ");
        match lines.next_line().await? {
            Some(answer) if answer.trim().eq_ignore_ascii_case("y") => quiz.restart(),
            _ => return Ok(()),
        }
    }
}

/// Walk through the questions; `None` when the user quits
async fn ask_all(quiz: &mut QuizSession, lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<QuizResults>> {
    loop {
        let Some(question) = quiz.current_question() else {
            return Ok(None);
        };
        println!(
            "\nQuestion {} of {} ({}% complete)",
            quiz.current_index() + 1,
            quiz.len(),
            quiz.progress_percentage()
        );
        println!("{}", question.question);
        for letter in ["A", "B", "C", "D"] {
            let selected = if quiz.selected_answer() == Some(letter) { "*" } else { " " };
            println!(" {}{}) {}", selected, letter, question.option(letter).unwrap_or_default());
        }

        eprint!("Answer [A-D], n=next, p=previous, q=quit: ");
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        match line.trim().to_ascii_lowercase().as_str() {
            "q" => return Ok(None),
            "p" => {
                if !quiz.previous() {
                    println!("Already at the first question.");
                }
            }
            "n" | "" => {
                if let QuizStep::Finished(results) = quiz.next()? {
                    return Ok(Some(results));
                }
            }
            answer => match quiz.select_answer(answer) {
                Ok(()) => {
                    if let QuizStep::Finished(results) = quiz.next()? {
                        return Ok(Some(results));
                    }
                }
                Err(e) => println!("{}", e),
            },
        }
    }
}

fn print_results(results: &QuizResults) {
    println!(
        "\nYou scored {} out of {} ({}%) - {}",
        results.score,
        results.total,
        results.percentage,
        if results.passed { "passed" } else { "keep practicing" }
    );
    for review in &results.review {
        let mark = if review.is_correct { "ok" } else { "x " };
        println!(
            "  {} Q{}: your answer {}, correct {}",
            mark,
            review.index + 1,
            review.answer.as_deref().unwrap_or("-"),
            review.correct_answer
        );
    }
}
