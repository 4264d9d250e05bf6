//! Centralized DDL for the learning-platform database.
//!
//! Every statement is `CREATE ... IF NOT EXISTS`, so the whole list can be
//! replayed against a live database. Table names come from [`TableNames`] and
//! are always emitted as quoted identifiers (`groups` is an SQL keyword).
//!
//! Statements are listed parents-first: a table only references tables that
//! appear before it.

use crate::core::config::TableNames;

/// One DDL statement and the table it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDdl {
    pub table: String,
    pub sql: String,
}

/// Quote an identifier for SQLite, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn ddl(table: &str, sql: String) -> TableDdl {
    TableDdl {
        table: table.to_string(),
        sql,
    }
}

/// Base tables for every entity, in creation order.
pub fn table_statements(t: &TableNames) -> Vec<TableDdl> {
    let organizations = quote_ident(&t.organizations);
    let org_api_keys = quote_ident(&t.org_api_keys);
    let users = quote_ident(&t.users);
    let user_organizations = quote_ident(&t.user_organizations);
    let milestones = quote_ident(&t.milestones);
    let cohorts = quote_ident(&t.cohorts);
    let user_cohorts = quote_ident(&t.user_cohorts);
    let groups = quote_ident(&t.groups);
    let user_groups = quote_ident(&t.user_groups);
    let courses = quote_ident(&t.courses);
    let course_cohorts = quote_ident(&t.course_cohorts);
    let tasks = quote_ident(&t.tasks);
    let questions = quote_ident(&t.questions);
    let scorecards = quote_ident(&t.scorecards);
    let question_scorecards = quote_ident(&t.question_scorecards);
    let chat_history = quote_ident(&t.chat_history);
    let task_completions = quote_ident(&t.task_completions);
    let course_tasks = quote_ident(&t.course_tasks);
    let course_milestones = quote_ident(&t.course_milestones);
    let course_generation_jobs = quote_ident(&t.course_generation_jobs);
    let task_generation_jobs = quote_ident(&t.task_generation_jobs);
    let code_drafts = quote_ident(&t.code_drafts);

    vec![
        ddl(
            &t.organizations,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {organizations} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        slug TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        default_logo_color TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        openai_api_key TEXT,
        openai_free_trial BOOLEAN
    )
"
            ),
        ),
        ddl(
            &t.org_api_keys,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {org_api_keys} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        org_id INTEGER NOT NULL,
        hashed_key TEXT NOT NULL UNIQUE,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (org_id) REFERENCES {organizations}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.users,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {users} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        first_name TEXT,
        middle_name TEXT,
        last_name TEXT,
        default_dp_color TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
"
            ),
        ),
        ddl(
            &t.user_organizations,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {user_organizations} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        org_id INTEGER NOT NULL,
        role TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(user_id, org_id),
        FOREIGN KEY (user_id) REFERENCES {users}(id) ON DELETE CASCADE,
        FOREIGN KEY (org_id) REFERENCES {organizations}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.milestones,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {milestones} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        color TEXT,
        ordering INTEGER,
        unlock_at DATETIME,
        org_id INTEGER NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (org_id) REFERENCES {organizations}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.cohorts,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {cohorts} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        org_id INTEGER NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (org_id) REFERENCES {organizations}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.user_cohorts,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {user_cohorts} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        cohort_id INTEGER NOT NULL,
        role TEXT NOT NULL,
        joined_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(user_id, cohort_id),
        FOREIGN KEY (user_id) REFERENCES {users}(id) ON DELETE CASCADE,
        FOREIGN KEY (cohort_id) REFERENCES {cohorts}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.groups,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {groups} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        cohort_id INTEGER NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (cohort_id) REFERENCES {cohorts}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.user_groups,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {user_groups} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        group_id INTEGER NOT NULL,
        UNIQUE(user_id, group_id),
        FOREIGN KEY (user_id) REFERENCES {users}(id) ON DELETE CASCADE,
        FOREIGN KEY (group_id) REFERENCES {groups}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.courses,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {courses} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        org_id INTEGER NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (org_id) REFERENCES {organizations}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.course_cohorts,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {course_cohorts} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        course_id INTEGER NOT NULL,
        cohort_id INTEGER NOT NULL,
        drip_config TEXT, -- JSON drip-release settings
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(course_id, cohort_id),
        FOREIGN KEY (course_id) REFERENCES {courses}(id) ON DELETE CASCADE,
        FOREIGN KEY (cohort_id) REFERENCES {cohorts}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.tasks,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {tasks} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        type TEXT NOT NULL,
        status TEXT NOT NULL,
        scheduled_publish_at DATETIME,
        ordering INTEGER,
        milestone_id INTEGER,
        deleted_at DATETIME, -- soft delete
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (milestone_id) REFERENCES {milestones}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.questions,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {questions} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        task_id INTEGER NOT NULL,
        blocks TEXT NOT NULL,
        answer TEXT,
        type TEXT NOT NULL,
        input_type TEXT NOT NULL,
        response_type TEXT NOT NULL,
        context TEXT,
        coding_languages TEXT,
        scorecard_id INTEGER,
        max_attempts INTEGER,
        is_feedback_shown BOOLEAN,
        title TEXT NOT NULL,
        deleted_at DATETIME, -- soft delete
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (task_id) REFERENCES {tasks}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.scorecards,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {scorecards} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        criteria TEXT NOT NULL,
        status TEXT NOT NULL,
        org_id INTEGER NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (org_id) REFERENCES {organizations}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.question_scorecards,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {question_scorecards} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        question_id INTEGER NOT NULL,
        scorecard_id INTEGER NOT NULL,
        UNIQUE(question_id, scorecard_id),
        FOREIGN KEY (question_id) REFERENCES {questions}(id) ON DELETE CASCADE,
        FOREIGN KEY (scorecard_id) REFERENCES {scorecards}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.chat_history,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {chat_history} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        question_id INTEGER NOT NULL,
        role TEXT,
        content TEXT,
        response_type TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (user_id) REFERENCES {users}(id) ON DELETE CASCADE,
        FOREIGN KEY (question_id) REFERENCES {questions}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.task_completions,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {task_completions} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        task_id INTEGER NOT NULL,
        completed_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(user_id, task_id),
        FOREIGN KEY (user_id) REFERENCES {users}(id) ON DELETE CASCADE,
        FOREIGN KEY (task_id) REFERENCES {tasks}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.course_tasks,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {course_tasks} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        course_id INTEGER NOT NULL,
        task_id INTEGER NOT NULL,
        ordering INTEGER,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(course_id, task_id),
        FOREIGN KEY (course_id) REFERENCES {courses}(id) ON DELETE CASCADE,
        FOREIGN KEY (task_id) REFERENCES {tasks}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.course_milestones,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {course_milestones} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        course_id INTEGER NOT NULL,
        milestone_id INTEGER NOT NULL,
        ordering INTEGER,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(course_id, milestone_id),
        FOREIGN KEY (course_id) REFERENCES {courses}(id) ON DELETE CASCADE,
        FOREIGN KEY (milestone_id) REFERENCES {milestones}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.course_generation_jobs,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {course_generation_jobs} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL,
        course_id INTEGER NOT NULL,
        status TEXT NOT NULL,
        job_details TEXT, -- JSON blob
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (course_id) REFERENCES {courses}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.task_generation_jobs,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {task_generation_jobs} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL,
        task_id INTEGER NOT NULL,
        course_id INTEGER NOT NULL,
        status TEXT NOT NULL,
        job_details TEXT, -- JSON blob
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (task_id) REFERENCES {tasks}(id) ON DELETE CASCADE,
        FOREIGN KEY (course_id) REFERENCES {courses}(id) ON DELETE CASCADE
    )
"
            ),
        ),
        ddl(
            &t.code_drafts,
            format!(
                "
    CREATE TABLE IF NOT EXISTS {code_drafts} (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        question_id INTEGER NOT NULL,
        code TEXT NOT NULL,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(user_id, question_id),
        FOREIGN KEY (user_id) REFERENCES {users}(id) ON DELETE CASCADE,
        FOREIGN KEY (question_id) REFERENCES {questions}(id) ON DELETE CASCADE
    )
"
            ),
        ),
    ]
}

/// Lookup indexes for child tables whose foreign-key columns are not already
/// covered by a UNIQUE constraint.
pub fn index_statements(t: &TableNames) -> Vec<TableDdl> {
    let specs: [(&str, &str, &str); 6] = [
        (t.chat_history.as_str(), "idx_chat_history_user_question", "user_id, question_id"),
        (t.tasks.as_str(), "idx_tasks_milestone", "milestone_id"),
        (t.questions.as_str(), "idx_questions_task", "task_id"),
        (t.course_generation_jobs.as_str(), "idx_course_generation_jobs_course", "course_id"),
        (t.task_generation_jobs.as_str(), "idx_task_generation_jobs_task", "task_id"),
        (t.task_generation_jobs.as_str(), "idx_task_generation_jobs_course", "course_id"),
    ];

    specs
        .iter()
        .map(|(table, index, columns)| {
            // Index names are scoped by table so renamed tables never collide.
            let index_name = quote_ident(&format!("{}__{}", table, index));
            ddl(
                table,
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {}({})",
                    index_name,
                    quote_ident(table),
                    columns
                ),
            )
        })
        .collect()
}
