use anyhow::Result;

use hakwonplus::config::Config;
use hakwonplus::ui::ExamResultView;

use super::open_context;

pub async fn exam_result(config: Config, exam_id: u64) -> Result<()> {
    let ctx = open_context(config)?;
    let result = ctx.client().exams().my_result(exam_id).await?;
    let view = ExamResultView::from(result);

    println!("Score:     {} / {}", view.total_score, view.max_score);
    println!("Pass:      {}", view.pass_label());
    println!("Submitted: {}", view.submitted_at);
    println!("Retake:    {}", if view.can_retake { "가능" } else { "불가" });
    if view.clinic_required {
        println!("Clinic:    required");
    }
    println!();
    println!("{:>4}  {:>6}  {:>6}  {:>8}", "No.", "Answer", "Key", "Score");
    for row in &view.rows {
        println!(
            "{:>4}  {:>6}  {:>6}  {:>4}/{:<4}{}",
            row.number,
            row.student_answer,
            row.correct_answer,
            row.score,
            row.max_score,
            if row.is_correct { "" } else { " ✗" }
        );
    }
    println!("\n{} / {} correct", view.correct_count(), view.rows.len());
    Ok(())
}
