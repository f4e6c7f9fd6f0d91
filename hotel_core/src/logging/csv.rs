use std::sync::Arc;
use chrono::{SecondsFormat, Utc};
use hotel_protocol::BillDetail;
use tokio::sync::{Mutex, OnceCell};
use tokio::{
    fs::{self, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
};

static SETTLEMENTS: OnceCell<Arc<Mutex<BufWriter<tokio::fs::File>>>> = OnceCell::const_new();

async fn ensure_dir() {
    let _ = fs::create_dir_all("logs").await;
}

async fn get_file(
    cell: &OnceCell<Arc<Mutex<BufWriter<tokio::fs::File>>>>,
    path: &str,
    header: &str,
) -> Arc<Mutex<BufWriter<tokio::fs::File>>> {
    let arc = cell.get_or_init(|| async move {
        ensure_dir().await;
        let fresh = !fs::try_exists(path).await.unwrap_or(false);
        let f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .expect("open log file");
        let writer = BufWriter::new(f);
        let m = Arc::new(Mutex::new(writer));
        if fresh {
            let mut g = m.lock().await;
            let _ = g.write_all(header.as_bytes()).await;
            let _ = g.flush().await;
        }
        m
    }).await;
    arc.clone()
}

fn iso(t: chrono::DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// settlements.csv: ts,room_id,detail_type,customer_id,fan_speed,ac_mode,start_time,end_time,duration_minutes,rate,cost
pub async fn log_settlement(d: &BillDetail) {
    let ts = Utc::now().to_rfc3339();
    let customer = d.customer_id.map(|c| c.to_string()).unwrap_or_else(|| "ADMIN".into());
    let line = format!(
        "{ts},{},{},{customer},{},{},{},{},{:.2},{:.2},{:.3}\n",
        d.room_id,
        d.detail_type,
        d.fan_speed,
        d.ac_mode,
        iso(d.start_time),
        iso(d.end_time),
        d.duration_minutes,
        d.rate,
        d.cost,
    );
    let file = get_file(
        &SETTLEMENTS,
        "logs/settlements.csv",
        "ts,room_id,detail_type,customer_id,fan_speed,ac_mode,start_time,end_time,duration_minutes,rate,cost\n",
    ).await;
    let mut f = file.lock().await;
    let _ = f.write_all(line.as_bytes()).await;
    let _ = f.flush().await;
}

/// Full ledger export. UTF-8 with BOM so spreadsheets pick the encoding up.
pub async fn export_bill_details(path: &str, details: &[BillDetail]) -> std::io::Result<()> {
    let mut out = String::from("\u{feff}");
    out.push_str(
        "room_id,customer_id,start_time,end_time,duration_minutes,fan_speed,ac_mode,rate,cost,detail_type\n",
    );
    for d in details {
        let customer = d.customer_id.map(|c| c.to_string()).unwrap_or_else(|| "ADMIN".into());
        out.push_str(&format!(
            "{},{customer},{},{},{:.2},{},{},{:.2},{:.3},{}\n",
            d.room_id,
            iso(d.start_time),
            iso(d.end_time),
            d.duration_minutes,
            d.fan_speed,
            d.ac_mode,
            d.rate,
            d.cost,
            d.detail_type,
        ));
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = fs::create_dir_all(parent).await;
        }
    }
    fs::write(path, out).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotel_protocol::{AcMode, DetailType, FanSpeed};
    use uuid::Uuid;

    #[tokio::test]
    async fn export_starts_with_bom_and_header() {
        let d = BillDetail {
            id: Uuid::new_v4(),
            room_id: 1,
            customer_id: None,
            ac_mode: AcMode::Cooling,
            fan_speed: FanSpeed::High,
            start_time: Utc::now(),
            end_time: Utc::now() + chrono::Duration::minutes(5),
            duration_minutes: 5.0,
            rate: 1.0,
            cost: 5.0,
            detail_type: DetailType::Ac,
        };
        let path = std::env::temp_dir().join("bill_details_export_test.csv");
        let path = path.to_str().unwrap();
        export_bill_details(path, &[d]).await.unwrap();
        let bytes = fs::read(path).await.unwrap();
        assert_eq!(&bytes[..3], [0xEF, 0xBB, 0xBF]);
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.trim_start_matches('\u{feff}').lines();
        assert!(lines.next().unwrap().starts_with("room_id,customer_id,start_time"));
        assert!(lines.next().unwrap().contains("ADMIN"));
        let _ = fs::remove_file(path).await;
    }
}
