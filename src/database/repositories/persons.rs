use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewPerson, Person, PersonFilter};
use crate::database::query_builder::fetch_optional_as;
use crate::filter::{FilterWhere, SqlResult};
use crate::types::{Page, PageRequest};

use super::paginate;

const PERSON_COLUMNS: &str = "pdat_person_id, fname, lname, birthday, business_flag, sec_users_id, \
     create_date, create_user, modify_date, modify_user, active_flag";

#[derive(Clone)]
pub struct PersonRepository {
    pool: PgPool,
}

impl PersonRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `Ok(None)` when the row is absent, or soft-deleted and `include_inactive` is off
    pub async fn find_by_id(&self, id: i32, include_inactive: bool) -> Result<Option<Person>, DatabaseError> {
        let mut filter = FilterWhere::new();
        filter.eq("pdat_person_id", id);
        if !include_inactive {
            filter.raw("active_flag = 'Y'");
        }

        let sql = SqlResult::new(
            format!("SELECT {} FROM pdat_person{}", PERSON_COLUMNS, filter.where_clause()),
            filter.into_params(),
        );
        fetch_optional_as::<Person>(&self.pool, &sql).await
    }

    pub async fn list(
        &self,
        owner_id: i32,
        criteria: &PersonFilter,
        page: PageRequest,
    ) -> Result<Page<Person>, DatabaseError> {
        let mut filter = FilterWhere::new();
        filter.eq("sec_users_id", owner_id);
        if !criteria.include_inactive {
            filter.raw("active_flag = 'Y'");
        }
        if let Some(first_name) = criteria.first_name.as_deref().filter(|s| !s.is_empty()) {
            filter.ilike_any(&["fname"], first_name);
        }
        if let Some(last_name) = criteria.last_name.as_deref().filter(|s| !s.is_empty()) {
            filter.ilike_any(&["lname"], last_name);
        }
        if let Some(business) = criteria.business {
            filter.eq("business_flag", if business { "Y" } else { "N" });
        }

        paginate(&self.pool, PERSON_COLUMNS, "pdat_person", filter, "pdat_person_id", page).await
    }

    /// Case-insensitive substring match on first or last name
    pub async fn search(&self, owner_id: i32, term: &str, page: PageRequest) -> Result<Page<Person>, DatabaseError> {
        let mut filter = FilterWhere::new();
        filter
            .eq("sec_users_id", owner_id)
            .raw("active_flag = 'Y'")
            .ilike_any(&["fname", "lname"], term);

        paginate(&self.pool, PERSON_COLUMNS, "pdat_person", filter, "pdat_person_id", page).await
    }

    pub async fn create(&self, person: &NewPerson) -> Result<Person, DatabaseError> {
        let sql = format!(
            "INSERT INTO pdat_person \
             (fname, lname, birthday, business_flag, sec_users_id, create_date, create_user, modify_date, modify_user, active_flag) \
             VALUES ($1, $2, $3, $4, $5, now(), $6, now(), $6, 'Y') \
             RETURNING {}",
            PERSON_COLUMNS
        );

        let created = sqlx::query_as::<_, Person>(&sql)
            .bind(&person.first_name)
            .bind(&person.last_name)
            .bind(person.birthday)
            .bind(&person.business_flag)
            .bind(person.user_id)
            .bind(&person.created_by)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    /// Write back every mutable field of `person` and stamp the modification
    pub async fn update(&self, person: &Person, modified_by: &str) -> Result<Person, DatabaseError> {
        let sql = format!(
            "UPDATE pdat_person \
             SET fname = $1, lname = $2, birthday = $3, business_flag = $4, active_flag = $5, \
                 modify_date = now(), modify_user = $6 \
             WHERE pdat_person_id = $7 \
             RETURNING {}",
            PERSON_COLUMNS
        );

        sqlx::query_as::<_, Person>(&sql)
            .bind(&person.first_name)
            .bind(&person.last_name)
            .bind(person.birthday)
            .bind(&person.business_flag)
            .bind(&person.active_flag)
            .bind(modified_by)
            .bind(person.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Person {} not found", person.id)))
    }

    /// Soft delete; `false` when there was no active row to deactivate
    pub async fn delete(&self, id: i32, modified_by: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE pdat_person SET active_flag = 'N', modify_date = now(), modify_user = $1 \
             WHERE pdat_person_id = $2 AND active_flag = 'Y'",
        )
        .bind(modified_by)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
