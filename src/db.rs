use anyhow::Context;
use chrono::{Duration, NaiveDate};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use circle_signals::error::SignalError;
use circle_signals::models::{
    parse_stat_date, CommitStatRecord, DateWindow, Group, MemberKey, MemberProfile,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_user(
    conn: &mut PgConnection,
    github_user_id: i64,
    github_username: &str,
    avatar_url: &str,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO circle_signals.users (id, github_user_id, github_username, avatar_url)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (github_user_id) DO UPDATE
        SET github_username = EXCLUDED.github_username, avatar_url = EXCLUDED.avatar_url
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(github_user_id)
    .bind(github_username)
    .bind(avatar_url)
    .fetch_one(&mut *conn)
    .await?
    .get("id");
    Ok(id)
}

async fn upsert_commit_stat(conn: &mut PgConnection, record: &CommitStatRecord) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO circle_signals.commit_stats
        (github_user_id, date, repository, commit_count, primary_hour, language)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (github_user_id, date, repository) DO UPDATE
        SET commit_count = EXCLUDED.commit_count,
            primary_hour = EXCLUDED.primary_hour,
            language = EXCLUDED.language,
            fetched_at = now()
        "#,
    )
    .bind(record.member_key.0)
    .bind(record.date)
    .bind(&record.repository)
    .bind(record.commit_count)
    .bind(record.primary_hour.map(i16::from))
    .bind(record.language.as_deref().unwrap_or(""))
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Seeds a small circle with a week of activity ending at `today`.
pub async fn seed(pool: &PgPool, today: NaiveDate) -> anyhow::Result<Uuid> {
    let users = vec![
        (581_001_i64, "avery-lee", "https://avatars.githubusercontent.com/u/581001"),
        (581_002_i64, "jules-moreno", "https://avatars.githubusercontent.com/u/581002"),
        (581_003_i64, "kiara-patel", "https://avatars.githubusercontent.com/u/581003"),
    ];

    let mut tx = pool.begin().await?;
    let mut user_ids = Vec::new();
    for (github_user_id, username, avatar_url) in &users {
        user_ids.push(upsert_user(&mut *tx, *github_user_id, username, avatar_url).await?);
    }

    let circle_id = Uuid::parse_str("9b5d3c1e-6a0f-4f6e-9c1d-2f7a8e4b5c60")?;
    sqlx::query(
        r#"
        INSERT INTO circle_signals.circles (id, name, owner_user_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(circle_id)
    .bind("night-owls")
    .bind(user_ids[0])
    .execute(&mut *tx)
    .await?;

    for user_id in &user_ids {
        sqlx::query(
            r#"
            INSERT INTO circle_signals.circle_members (circle_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (circle_id, user_id) DO NOTHING
            "#,
        )
        .bind(circle_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    let activity = vec![
        (581_001_i64, 0, "avery-lee/api", 5, Some(23), "TypeScript"),
        (581_002_i64, 0, "jules-moreno/web", 2, Some(23), "TypeScript"),
        (581_003_i64, 0, "kiara-patel/cli", 1, Some(9), "Rust"),
        (581_001_i64, 2, "avery-lee/api", 3, Some(10), "Go"),
        (581_003_i64, 2, "kiara-patel/cli", 4, Some(11), "Rust"),
        (581_001_i64, 4, "avery-lee/infra", 1, None, "HCL"),
        (581_002_i64, 5, "jules-moreno/web", 6, Some(21), "TypeScript"),
    ];

    for (github_user_id, days_ago, repository, commit_count, hour, language) in activity {
        let record = CommitStatRecord {
            member_key: MemberKey(github_user_id),
            date: today - Duration::days(days_ago),
            repository: repository.to_string(),
            commit_count,
            primary_hour: hour,
            language: Some(language.to_string()),
        };
        upsert_commit_stat(&mut *tx, &record).await?;
    }

    tx.commit().await?;
    Ok(circle_id)
}

/// Imports commit statistics from CSV.
///
/// Every row is validated before anything is written, and all writes share one
/// transaction, so a bad file leaves the database untouched.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        github_user_id: i64,
        github_username: Option<String>,
        avatar_url: Option<String>,
        date: String,
        repository: String,
        commit_count: i32,
        primary_hour: Option<i16>,
        language: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut users = Vec::new();
    let mut records = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let context = || format!("row {} of {}", line + 1, csv_path.display());
        let row = result.with_context(context)?;
        let member_key = MemberKey(row.github_user_id);
        let date = parse_stat_date(member_key, &row.date).with_context(context)?;
        let commit_count = commit_count_from_column(member_key, row.commit_count).with_context(context)?;
        let primary_hour = match row.primary_hour {
            Some(hour) => Some(hour_from_column(member_key, hour).with_context(context)?),
            None => None,
        };

        if let Some(username) = row.github_username {
            users.push((row.github_user_id, username, row.avatar_url.unwrap_or_default()));
        }

        records.push(CommitStatRecord {
            member_key,
            date,
            repository: row.repository,
            commit_count,
            primary_hour,
            language: row.language.filter(|lang| !lang.is_empty()),
        });
    }

    let mut tx = pool.begin().await?;
    for (github_user_id, username, avatar_url) in &users {
        upsert_user(&mut *tx, *github_user_id, username, avatar_url).await?;
    }

    let mut imported = 0usize;
    for record in &records {
        if upsert_commit_stat(&mut *tx, record).await? > 0 {
            imported += 1;
        }
    }
    tx.commit().await?;

    Ok(imported)
}

fn commit_count_from_column(member_key: MemberKey, commit_count: i32) -> Result<i32, SignalError> {
    if commit_count < 0 {
        return Err(SignalError::MalformedRecord {
            member: member_key,
            reason: format!("negative commit count {commit_count}"),
        });
    }
    Ok(commit_count)
}

fn hour_from_column(member_key: MemberKey, hour: i16) -> Result<u8, SignalError> {
    u8::try_from(hour)
        .ok()
        .filter(|hour| *hour <= 23)
        .ok_or_else(|| SignalError::MalformedRecord {
            member: member_key,
            reason: format!("primary hour {hour} out of range"),
        })
}

pub async fn fetch_commit_stats(
    pool: &PgPool,
    members: &[MemberKey],
    window: DateWindow,
) -> anyhow::Result<Vec<CommitStatRecord>> {
    let keys: Vec<i64> = members.iter().map(|key| key.0).collect();
    let rows = sqlx::query(
        r#"
        SELECT github_user_id, date, repository, commit_count, primary_hour, language
        FROM circle_signals.commit_stats
        WHERE github_user_id = ANY($1) AND date >= $2 AND date <= $3
        ORDER BY github_user_id ASC, date ASC, repository ASC
        "#,
    )
    .bind(&keys)
    .bind(window.start)
    .bind(window.end)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let member_key = MemberKey(row.get("github_user_id"));
        let primary_hour: Option<i16> = row.get("primary_hour");
        let language: Option<String> = row.get("language");
        records.push(CommitStatRecord {
            member_key,
            date: row.get("date"),
            repository: row.get("repository"),
            commit_count: commit_count_from_column(member_key, row.get("commit_count"))?,
            primary_hour: match primary_hour {
                Some(hour) => Some(hour_from_column(member_key, hour)?),
                None => None,
            },
            language: language.filter(|lang| !lang.is_empty()),
        });
    }

    Ok(records)
}

const CIRCLE_MEMBERS_QUERY: &str = "SELECT c.id AS circle_id, c.name AS circle_name, \
     u.id AS user_id, u.github_user_id, u.github_username, u.avatar_url \
     FROM circle_signals.circles c \
     JOIN circle_signals.circle_members m ON m.circle_id = c.id \
     JOIN circle_signals.users u ON u.id = m.user_id";

fn fold_groups(rows: Vec<PgRow>) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();

    for row in rows {
        let circle_id: Uuid = row.get("circle_id");
        let member = MemberProfile {
            member_key: MemberKey(row.get("github_user_id")),
            display_name: row.get("github_username"),
            avatar_url: row.get("avatar_url"),
            account_id: row.get("user_id"),
        };

        match groups.last_mut() {
            Some(group) if group.id == circle_id => group.members.push(member),
            _ => groups.push(Group {
                id: circle_id,
                name: row.get("circle_name"),
                members: vec![member],
            }),
        }
    }

    groups
}

pub async fn fetch_group(pool: &PgPool, circle_id: Uuid) -> anyhow::Result<Option<Group>> {
    let query = format!("{CIRCLE_MEMBERS_QUERY} WHERE c.id = $1 ORDER BY u.github_user_id ASC");
    let rows = sqlx::query(&query).bind(circle_id).fetch_all(pool).await?;
    Ok(fold_groups(rows).into_iter().next())
}

pub async fn fetch_groups_for_account(pool: &PgPool, account_id: Uuid) -> anyhow::Result<Vec<Group>> {
    let query = format!(
        "{CIRCLE_MEMBERS_QUERY} \
         WHERE c.id IN (SELECT circle_id FROM circle_signals.circle_members WHERE user_id = $1) \
         ORDER BY c.created_at ASC, c.id ASC, u.github_user_id ASC"
    );
    let rows = sqlx::query(&query).bind(account_id).fetch_all(pool).await?;
    Ok(fold_groups(rows))
}

pub async fn fetch_account_label(pool: &PgPool, account_id: Uuid) -> anyhow::Result<Option<String>> {
    let row = sqlx::query("SELECT github_username FROM circle_signals.users WHERE id = $1")
        .bind(account_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| row.get("github_username")))
}
