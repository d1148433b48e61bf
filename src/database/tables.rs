//! Declarative descriptors for every resource served by the generic
//! table dispatcher. Every identifier the dispatcher writes into SQL comes
//! from these static values.

/// How a resource is scoped to the authenticated user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tenancy {
    /// Shared reference data visible to everyone
    Global,
    /// The base table carries `sec_users_id` directly
    OwnerColumn,
    /// Owned through the parent `pdat_person` row
    ViaPerson,
}

/// SQL type a writable column is cast to when bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
}

impl ColumnKind {
    pub fn cast(self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Integer => "integer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritableColumn {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn text(name: &'static str) -> WritableColumn {
    WritableColumn { name, kind: ColumnKind::Text }
}

const fn integer(name: &'static str) -> WritableColumn {
    WritableColumn { name, kind: ColumnKind::Integer }
}

/// Query-string filter accepted by a list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFilter {
    /// Case-insensitive substring match across one or more columns
    Contains {
        param: &'static str,
        columns: &'static [&'static str],
    },
    /// `true`/`false` mapped onto a `Y`/`N` column
    Flag {
        param: &'static str,
        column: &'static str,
    },
    /// Exact integer match
    Exact {
        param: &'static str,
        column: &'static str,
    },
}

impl QueryFilter {
    pub fn param(&self) -> &'static str {
        match self {
            QueryFilter::Contains { param, .. } => param,
            QueryFilter::Flag { param, .. } => param,
            QueryFilter::Exact { param, .. } => param,
        }
    }
}

#[derive(Debug)]
pub struct TableConfig {
    /// Route segment and lookup key
    pub key: &'static str,
    /// Table or view that reads go through
    pub read_source: &'static str,
    /// Table that writes and deletes target
    pub base_table: &'static str,
    pub id_column: &'static str,
    /// Projected columns, in response order
    pub columns: &'static [&'static str],
    pub order_by: &'static str,
    pub tenancy: Tenancy,
    pub uses_view: bool,
    pub filters: &'static [QueryFilter],
    pub writable: &'static [WritableColumn],
    pub deletable: bool,
    /// Replacement read source for `show_inactive=true`
    pub inactive_source: Option<&'static str>,
}

impl TableConfig {
    pub fn is_multi_tenant(&self) -> bool {
        self.tenancy != Tenancy::Global
    }

    pub fn writable_column(&self, name: &str) -> Option<&'static WritableColumn> {
        self.writable.iter().find(|c| c.name == name)
    }

    pub fn supports_writes(&self) -> bool {
        !self.writable.is_empty()
    }
}

pub const OWNER_COLUMN: &str = "sec_users_id";
pub const PERSON_COLUMN: &str = "pdat_person_id";

const PERSON_NAME: QueryFilter = QueryFilter::Contains {
    param: "name",
    columns: &["person_fname", "person_lname"],
};
const PERSON_ID: QueryFilter = QueryFilter::Exact {
    param: "person_id",
    column: PERSON_COLUMN,
};

pub static TABLES: &[TableConfig] = &[
    TableConfig {
        key: "people",
        read_source: "v_active_people",
        base_table: "pdat_person",
        id_column: "pdat_person_id",
        columns: &[
            "pdat_person_id", "fname", "lname", "full_name", "birthday", "business_flag",
            "sec_users_id", "create_date", "create_user", "modify_date", "modify_user", "active_flag",
        ],
        order_by: "lname, fname",
        tenancy: Tenancy::OwnerColumn,
        uses_view: true,
        filters: &[
            QueryFilter::Contains { param: "name", columns: &["fname", "lname"] },
            QueryFilter::Contains { param: "fname", columns: &["fname"] },
            QueryFilter::Contains { param: "lname", columns: &["lname"] },
            QueryFilter::Flag { param: "business_flag", column: "business_flag" },
        ],
        writable: &[],
        deletable: true,
        inactive_source: Some(
            "(SELECT p.*, TRIM(COALESCE(p.fname, '') || ' ' || COALESCE(p.lname, '')) AS full_name FROM pdat_person p) AS src",
        ),
    },
    TableConfig {
        key: "addresses",
        read_source: "v_person_addresses",
        base_table: "pdat_address",
        id_column: "pdat_address_id",
        columns: &[
            "pdat_address_id", "pdat_person_id", "addr1", "addr2", "city", "cmn_states_id",
            "state_abbrev", "state_name", "zip", "zip_plus_4", "country", "person_fname",
            "person_lname", "full_name", "create_date", "create_user", "modify_date", "modify_user",
        ],
        order_by: "person_lname, person_fname",
        tenancy: Tenancy::ViaPerson,
        uses_view: true,
        filters: &[
            QueryFilter::Contains { param: "city", columns: &["city"] },
            PERSON_NAME,
            PERSON_ID,
        ],
        writable: &[
            text("addr1"),
            text("addr2"),
            text("city"),
            integer("cmn_states_id"),
            text("zip"),
            text("zip_plus_4"),
            text("country"),
            integer("pdat_person_id"),
        ],
        deletable: true,
        inactive_source: None,
    },
    TableConfig {
        key: "emails",
        read_source: "v_person_emails",
        base_table: "pdat_pers_emails",
        id_column: "pdat_pers_emails_id",
        columns: &[
            "pdat_pers_emails_id", "pdat_person_id", "email_addr", "pdat_email_types_id",
            "email_type_name", "person_fname", "person_lname", "full_name", "create_date",
            "create_user", "modify_date", "modify_user",
        ],
        order_by: "person_lname, person_fname",
        tenancy: Tenancy::ViaPerson,
        uses_view: true,
        filters: &[
            QueryFilter::Contains { param: "email", columns: &["email_addr"] },
            PERSON_NAME,
            PERSON_ID,
        ],
        writable: &[text("email_addr"), integer("pdat_person_id"), integer("pdat_email_types_id")],
        deletable: true,
        inactive_source: None,
    },
    TableConfig {
        key: "phones",
        read_source: "v_person_phones",
        base_table: "pdat_pers_phone",
        id_column: "pdat_pers_phone_id",
        columns: &[
            "pdat_pers_phone_id", "pdat_person_id", "phone_num", "phone_ext", "country_code",
            "pdat_phone_type_id", "phone_type_name", "person_fname", "person_lname", "full_name",
            "create_date", "create_user", "modify_date", "modify_user",
        ],
        order_by: "person_lname, person_fname",
        tenancy: Tenancy::ViaPerson,
        uses_view: true,
        filters: &[
            QueryFilter::Contains { param: "phone", columns: &["phone_num"] },
            PERSON_NAME,
            PERSON_ID,
        ],
        writable: &[
            text("phone_num"),
            text("phone_ext"),
            text("country_code"),
            integer("pdat_phone_type_id"),
            integer("pdat_person_id"),
        ],
        deletable: true,
        inactive_source: None,
    },
    TableConfig {
        key: "notes",
        read_source: "v_person_notes",
        base_table: "pdat_pers_notes",
        id_column: "pdat_pers_notes_id",
        columns: &[
            "pdat_pers_notes_id", "pdat_person_id", "note_text", "person_fname", "person_lname",
            "full_name", "create_date", "create_user", "modify_date", "modify_user",
        ],
        order_by: "create_date DESC",
        tenancy: Tenancy::ViaPerson,
        uses_view: true,
        filters: &[
            QueryFilter::Contains { param: "text", columns: &["note_text"] },
            PERSON_NAME,
            PERSON_ID,
        ],
        writable: &[text("note_text"), integer("pdat_person_id")],
        deletable: true,
        inactive_source: None,
    },
    TableConfig {
        key: "links",
        read_source: "v_person_links",
        base_table: "pdat_links",
        id_column: "pdat_links_id",
        columns: &[
            "pdat_links_id", "link_text", "link_url", "note", "pdat_person_id", "sec_users_id",
            "person_fname", "person_lname", "full_name", "create_date", "create_user",
            "modify_date", "modify_user",
        ],
        order_by: "link_text",
        tenancy: Tenancy::OwnerColumn,
        uses_view: true,
        filters: &[
            QueryFilter::Contains { param: "link", columns: &["link_text", "link_url"] },
            PERSON_ID,
        ],
        writable: &[text("link_text"), text("link_url"), text("note"), integer("pdat_person_id")],
        deletable: true,
        inactive_source: None,
    },
    TableConfig {
        key: "accounts",
        read_source: "sec_accounts",
        base_table: "sec_accounts",
        id_column: "sec_accounts_id",
        // password hash is deliberately absent
        columns: &[
            "sec_accounts_id", "name", "sec_users_id", "create_date", "create_user", "modify_date",
            "modify_user",
        ],
        order_by: "name",
        tenancy: Tenancy::OwnerColumn,
        uses_view: false,
        filters: &[],
        writable: &[],
        deletable: false,
        inactive_source: None,
    },
    TableConfig {
        key: "users-table",
        read_source: "sec_users",
        base_table: "sec_users",
        id_column: "sec_users_id",
        columns: &["sec_users_id", "fname", "lname", "create_date", "create_user", "modify_date", "modify_user"],
        order_by: "lname, fname",
        tenancy: Tenancy::OwnerColumn,
        uses_view: false,
        filters: &[],
        writable: &[],
        deletable: false,
        inactive_source: None,
    },
    TableConfig {
        key: "roles",
        read_source: "sec_roles",
        base_table: "sec_roles",
        id_column: "sec_roles_id",
        columns: &["sec_roles_id", "name", "descr"],
        order_by: "name",
        tenancy: Tenancy::Global,
        uses_view: false,
        filters: &[QueryFilter::Contains { param: "name", columns: &["name"] }],
        writable: &[],
        deletable: false,
        inactive_source: None,
    },
    TableConfig {
        key: "email-types",
        read_source: "pdat_email_types",
        base_table: "pdat_email_types",
        id_column: "pdat_email_types_id",
        columns: &["pdat_email_types_id", "name"],
        order_by: "name",
        tenancy: Tenancy::Global,
        uses_view: false,
        filters: &[QueryFilter::Contains { param: "name", columns: &["name"] }],
        writable: &[],
        deletable: false,
        inactive_source: None,
    },
    TableConfig {
        key: "phone-types",
        read_source: "pdat_phone_type",
        base_table: "pdat_phone_type",
        id_column: "pdat_phone_type_id",
        columns: &["pdat_phone_type_id", "name"],
        order_by: "name",
        tenancy: Tenancy::Global,
        uses_view: false,
        filters: &[QueryFilter::Contains { param: "name", columns: &["name"] }],
        writable: &[],
        deletable: false,
        inactive_source: None,
    },
];

pub fn lookup(key: &str) -> Option<&'static TableConfig> {
    TABLES.iter().find(|t| t.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Column names in an ORDER BY list, without direction keywords
    fn order_columns(order_by: &str) -> Vec<&str> {
        order_by
            .split(',')
            .filter_map(|part| part.split_whitespace().next())
            .collect()
    }

    #[test]
    fn keys_are_unique_and_resolvable() {
        let mut seen = HashSet::new();
        for table in TABLES {
            assert!(seen.insert(table.key), "duplicate key {}", table.key);
            assert_eq!(lookup(table.key).map(|t| t.key), Some(table.key));
        }
        assert!(lookup("pdat_person").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn projections_cover_id_and_order_columns() {
        for table in TABLES {
            assert!(table.columns.contains(&table.id_column), "{} misses its id column", table.key);
            for column in order_columns(table.order_by) {
                assert!(table.columns.contains(&column), "{} cannot order by {}", table.key, column);
            }
        }
    }

    #[test]
    fn view_backed_tables_write_to_a_different_base_table() {
        for table in TABLES {
            if table.uses_view {
                assert_ne!(table.read_source, table.base_table, "{}", table.key);
            } else {
                assert_eq!(table.read_source, table.base_table, "{}", table.key);
            }
        }
    }

    #[test]
    fn server_controlled_columns_are_never_writable() {
        let server_columns = [
            "create_date", "create_user", "modify_date", "modify_user", "active_flag", OWNER_COLUMN,
        ];
        for table in TABLES {
            for column in table.writable {
                assert!(!server_columns.contains(&column.name), "{} exposes {}", table.key, column.name);
                assert_ne!(column.name, table.id_column, "{} exposes its id", table.key);
            }
        }
    }

    #[test]
    fn child_resources_can_name_their_parent() {
        for table in TABLES.iter().filter(|t| t.tenancy == Tenancy::ViaPerson) {
            assert!(table.writable_column(PERSON_COLUMN).is_some(), "{}", table.key);
        }
    }

    #[test]
    fn lookup_tables_are_global_and_read_only() {
        for key in ["roles", "email-types", "phone-types"] {
            let table = lookup(key).unwrap();
            assert!(!table.is_multi_tenant());
            assert!(!table.supports_writes());
            assert!(!table.deletable);
        }
    }

    #[test]
    fn account_projection_hides_password() {
        let accounts = lookup("accounts").unwrap();
        assert!(!accounts.columns.contains(&"password"));
    }
}
