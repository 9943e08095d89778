//! Status badges and one-line renderings of tracked jobs.

use loyalty_core::upload_job::{JobStatus, UploadJob};

/// Icon and color used to show a job's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBadge {
    pub icon: &'static str,
    /// CSS-style color name.
    pub color: &'static str,
    /// ANSI SGR foreground code for terminals.
    pub ansi: u8,
}

pub fn badge(status: JobStatus) -> StatusBadge {
    match status {
        JobStatus::Uploading => StatusBadge {
            icon: "⇡",
            color: "blue",
            ansi: 34,
        },
        JobStatus::Processing => StatusBadge {
            icon: "⟳",
            color: "amber",
            ansi: 33,
        },
        JobStatus::Completed => StatusBadge {
            icon: "✓",
            color: "green",
            ansi: 32,
        },
        JobStatus::Failed => StatusBadge {
            icon: "✗",
            color: "red",
            ansi: 31,
        },
    }
}

/// `✓ march.xlsx [completed] 9/10 processed, 1 failed, 0 skipped (job-1)`
pub fn render_line(job: &UploadJob, colored: bool) -> String {
    let badge = badge(job.status);
    let icon = if colored {
        format!("\x1b[{}m{}\x1b[0m", badge.ansi, badge.icon)
    } else {
        badge.icon.to_string()
    };

    let name = if job.file_name.is_empty() {
        "<unnamed>"
    } else {
        job.file_name.as_str()
    };

    let mut line = format!("{icon} {name} [{}]", job.status);
    if job.progress.total > 0 {
        line.push_str(&format!(
            " {}/{} processed, {} failed, {} skipped",
            job.progress.processed, job.progress.total, job.progress.failed, job.progress.skipped
        ));
    }
    line.push_str(&format!(" ({})", job.id));
    if let Some(err) = &job.error_message {
        line.push_str(&format!(": {err}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use loyalty_core::upload_job::JobProgress;

    use super::*;

    #[test]
    fn every_status_has_a_distinct_badge() {
        let all = [
            JobStatus::Uploading,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(badge(*a).icon, badge(*b).icon);
                assert_ne!(badge(*a).color, badge(*b).color);
            }
        }
    }

    #[test]
    fn render_line_includes_progress_once_total_is_known() {
        let mut job = UploadJob::submitted("job-1", "march.xlsx", "br-1");
        assert_eq!(render_line(&job, false), "⇡ march.xlsx [uploading] (job-1)");

        job.status = JobStatus::Completed;
        job.progress = JobProgress {
            processed: 9,
            total: 10,
            failed: 1,
            skipped: 0,
        };
        assert_eq!(
            render_line(&job, false),
            "✓ march.xlsx [completed] 9/10 processed, 1 failed, 0 skipped (job-1)"
        );
    }

    #[test]
    fn render_line_shows_error_and_colors() {
        let mut job = UploadJob::submitted("job-2", "", "br-1");
        job.status = JobStatus::Failed;
        job.error_message = Some("Cancelled by user".into());

        let line = render_line(&job, true);
        assert!(line.starts_with("\x1b[31m✗\x1b[0m <unnamed> [failed]"));
        assert!(line.ends_with("(job-2): Cancelled by user"));
    }
}
