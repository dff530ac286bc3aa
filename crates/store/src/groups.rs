use models::{DupeGroup, DupeGroupMember, Id};

use crate::{Result, Store};

impl Store {
    /// delete_dupe_groups_by_scan removes every group (and, via cascade,
    /// every member) previously recorded for a scan. The ranking phase
    /// calls this before re-inserting, which is what makes a retried
    /// ranking job idempotent rather than a source of duplicate groups.
    pub async fn delete_dupe_groups_by_scan(&self, scan_id: Id) -> Result<()> {
        sqlx::query("delete from dupe_groups where scan_id = $1")
            .bind(scan_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// insert_dupe_group writes a group and its ranked members in a single
    /// transaction.
    pub async fn insert_dupe_group(&self, group: &DupeGroup) -> Result<()> {
        let mut txn = self.pool.begin().await?;

        sqlx::query(
            r#"
            insert into dupe_groups (id, scan_id, label, confidence, relationship)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(group.id)
        .bind(group.scan_id)
        .bind(&group.label)
        .bind(group.confidence)
        .bind(serde_json::to_string(&group.relationship).unwrap_or_default())
        .execute(&mut *txn)
        .await?;

        for member in &group.members {
            sqlx::query(
                r#"
                insert into dupe_group_members (group_id, pr_number, rank, score, rationale)
                values ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(member.group_id)
            .bind(member.pr_number)
            .bind(member.rank)
            .bind(member.score)
            .bind(&member.rationale)
            .execute(&mut *txn)
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    pub async fn list_dupe_groups_by_scan(&self, scan_id: Id) -> Result<Vec<DupeGroup>> {
        let groups = sqlx::query_as::<_, DupeGroupRow>(
            r#"
            select id, scan_id, label, confidence, relationship
            from dupe_groups where scan_id = $1
            order by id
            "#,
        )
        .bind(scan_id)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(groups.len());
        for row in groups {
            let members = sqlx::query_as::<_, DupeGroupMember>(
                r#"
                select group_id, pr_number, rank, score, rationale
                from dupe_group_members where group_id = $1
                order by rank
                "#,
            )
            .bind(row.id)
            .fetch_all(&self.pool)
            .await?;

            out.push(DupeGroup {
                id: row.id,
                scan_id: row.scan_id,
                label: row.label,
                confidence: row.confidence,
                relationship: serde_json::from_str(&row.relationship)
                    .unwrap_or(models::Relationship::Error),
                members,
            });
        }
        Ok(out)
    }
}

#[derive(sqlx::FromRow)]
struct DupeGroupRow {
    id: Id,
    scan_id: Id,
    label: String,
    confidence: f64,
    relationship: String,
}
