use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Booking, BookingStatus, Guest, Money, Package, PackageStatus};
use crate::repository::BookingFilter;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, package_id, user_id, check_in, check_out, party_size, total_price, \
     status, confirmation_code, special_requests, created_at, updated_at";

const PACKAGE_COLUMNS: &str =
    "id, name, description, price, capacity, duration, status, created_at, updated_at";

// ── Packages ──

pub fn insert_package(conn: &Connection, package: &Package) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO packages (id, name, description, price, capacity, duration, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            package.id,
            package.name,
            package.description,
            package.price.minor(),
            package.capacity,
            package.duration,
            package.status.as_str(),
            format_timestamp(&package.created_at),
            format_timestamp(&package.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_package(conn: &Connection, id: &str) -> anyhow::Result<Option<Package>> {
    let sql = format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id], |row| Ok(parse_package_row(row)))
        .optional()?;
    row.transpose()
}

pub fn list_packages(
    conn: &Connection,
    status: Option<PackageStatus>,
) -> anyhow::Result<Vec<Package>> {
    let (sql, params_vec): (String, Vec<Box<dyn ToSql>>) = match status {
        Some(status) => (
            format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE status = ?1 ORDER BY created_at DESC"),
            vec![Box::new(status.as_str()) as Box<dyn ToSql>],
        ),
        None => (
            format!("SELECT {PACKAGE_COLUMNS} FROM packages ORDER BY created_at DESC"),
            vec![],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_package_row(row)))?;

    let mut packages = vec![];
    for row in rows {
        packages.push(row??);
    }
    Ok(packages)
}

fn parse_package_row(row: &rusqlite::Row) -> anyhow::Result<Package> {
    let status_str: String = row.get(6)?;
    let status = PackageStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown package status: {status_str}"))?;

    Ok(Package {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: Money::from_minor(row.get(3)?),
        capacity: row.get(4)?,
        duration: row.get(5)?,
        status,
        created_at: parse_timestamp(&row.get::<_, String>(7)?)?,
        updated_at: parse_timestamp(&row.get::<_, String>(8)?)?,
    })
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, package_id, user_id, check_in, check_out, party_size, total_price,
                               status, confirmation_code, special_requests, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.id,
            booking.package_id,
            booking.user_id,
            format_date(&booking.check_in),
            format_date(&booking.check_out),
            booking.party_size,
            booking.total_price.minor(),
            booking.status.as_str(),
            booking.confirmation_code,
            booking.special_requests,
            format_timestamp(&booking.created_at),
            format_timestamp(&booking.updated_at),
        ],
    )?;
    Ok(())
}

/// Writes every mutable column of `booking` back to its row.
pub fn save_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings
         SET check_in = ?1, check_out = ?2, party_size = ?3, total_price = ?4,
             status = ?5, special_requests = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            format_date(&booking.check_in),
            format_date(&booking.check_out),
            booking.party_size,
            booking.total_price.minor(),
            booking.status.as_str(),
            booking.special_requests,
            format_timestamp(&booking.updated_at),
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;
    row.transpose()
}

pub fn get_booking_by_code(conn: &Connection, code: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE confirmation_code = ?1");
    let row = conn
        .query_row(&sql, params![code], |row| Ok(parse_booking_row(row)))
        .optional()?;
    row.transpose()
}

/// Bookings of a package in one of `statuses` whose stay intersects
/// `[check_in, check_out)`.
pub fn find_overlapping(
    conn: &Connection,
    package_id: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
    statuses: &[BookingStatus],
    exclude_id: Option<&str>,
) -> anyhow::Result<Vec<Booking>> {
    if statuses.is_empty() {
        return Ok(vec![]);
    }

    let mut params_vec: Vec<Box<dyn ToSql>> = vec![
        Box::new(package_id.to_string()) as Box<dyn ToSql>,
        Box::new(format_date(&check_out)),
        Box::new(format_date(&check_in)),
    ];

    let mut placeholders = Vec::with_capacity(statuses.len());
    for status in statuses {
        params_vec.push(Box::new(status.as_str()));
        placeholders.push(format!("?{}", params_vec.len()));
    }

    let mut sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE package_id = ?1 AND check_in < ?2 AND ?3 < check_out AND status IN ({})",
        placeholders.join(", ")
    );

    if let Some(exclude_id) = exclude_id {
        params_vec.push(Box::new(exclude_id.to_string()));
        sql.push_str(&format!(" AND id != ?{}", params_vec.len()));
    }
    sql.push_str(" ORDER BY check_in ASC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<Vec<Booking>> {
    let mut clauses: Vec<String> = vec![];
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![];

    if let Some(status) = filter.status {
        params_vec.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", params_vec.len()));
    }
    if let Some(package_id) = &filter.package_id {
        params_vec.push(Box::new(package_id.clone()));
        clauses.push(format!("package_id = ?{}", params_vec.len()));
    }
    if let Some(user_id) = &filter.user_id {
        params_vec.push(Box::new(user_id.clone()));
        clauses.push(format!("user_id = ?{}", params_vec.len()));
    }
    if let Some(code) = &filter.confirmation_code {
        params_vec.push(Box::new(code.clone()));
        clauses.push(format!("instr(confirmation_code, ?{}) > 0", params_vec.len()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    params_vec.push(Box::new(filter.limit()));
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings {where_clause} ORDER BY created_at DESC, id ASC LIMIT ?{}",
        params_vec.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let status_str: String = row.get(7)?;
    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown booking status: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        package_id: row.get(1)?,
        user_id: row.get(2)?,
        check_in: parse_date(&row.get::<_, String>(3)?)?,
        check_out: parse_date(&row.get::<_, String>(4)?)?,
        party_size: row.get(5)?,
        total_price: Money::from_minor(row.get(6)?),
        status,
        confirmation_code: row.get(8)?,
        special_requests: row.get(9)?,
        created_at: parse_timestamp(&row.get::<_, String>(10)?)?,
        updated_at: parse_timestamp(&row.get::<_, String>(11)?)?,
    })
}

// ── Guests ──

pub fn insert_guest(conn: &Connection, guest: &Guest) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO guests (id, booking_id, name, age, phone, emergency_contact, emergency_phone,
                             dietary_requirements, id_number, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            guest.id,
            guest.booking_id,
            guest.name,
            guest.age,
            guest.phone,
            guest.emergency_contact,
            guest.emergency_phone,
            guest.dietary_requirements,
            guest.id_number,
            format_timestamp(&guest.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_guests_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<Guest>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, name, age, phone, emergency_contact, emergency_phone,
                dietary_requirements, id_number, created_at
         FROM guests WHERE booking_id = ?1 ORDER BY created_at ASC, rowid ASC",
    )?;

    let rows = stmt.query_map(params![booking_id], |row| Ok(parse_guest_row(row)))?;

    let mut guests = vec![];
    for row in rows {
        guests.push(row??);
    }
    Ok(guests)
}

pub fn get_guest(conn: &Connection, id: &str) -> anyhow::Result<Option<Guest>> {
    let row = conn
        .query_row(
            "SELECT id, booking_id, name, age, phone, emergency_contact, emergency_phone,
                    dietary_requirements, id_number, created_at
             FROM guests WHERE id = ?1",
            params![id],
            |row| Ok(parse_guest_row(row)),
        )
        .optional()?;
    row.transpose()
}

/// Writes every mutable guest field. Returns false if no row matched.
pub fn save_guest(conn: &Connection, guest: &Guest) -> anyhow::Result<bool> {
    let changed = conn.execute(
        "UPDATE guests SET name = ?2, age = ?3, phone = ?4, emergency_contact = ?5,
                emergency_phone = ?6, dietary_requirements = ?7, id_number = ?8
         WHERE id = ?1",
        params![
            guest.id,
            guest.name,
            guest.age,
            guest.phone,
            guest.emergency_contact,
            guest.emergency_phone,
            guest.dietary_requirements,
            guest.id_number,
        ],
    )?;
    Ok(changed > 0)
}

pub fn delete_guest(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let changed = conn.execute("DELETE FROM guests WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

fn parse_guest_row(row: &rusqlite::Row) -> anyhow::Result<Guest> {
    Ok(Guest {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        name: row.get(2)?,
        age: row.get(3)?,
        phone: row.get(4)?,
        emergency_contact: row.get(5)?,
        emergency_phone: row.get(6)?,
        dietary_requirements: row.get(7)?,
        id_number: row.get(8)?,
        created_at: parse_timestamp(&row.get::<_, String>(9)?)?,
    })
}

// ── Formatting ──

fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| anyhow::anyhow!("invalid stored date {s:?}: {e}"))
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| anyhow::anyhow!("invalid stored timestamp {s:?}: {e}"))
}
