//! CSV export of equipment lists

use csv::{QuoteStyle, WriterBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::Equipment,
        settings::{OptionList, SettingsData},
    },
};

const BOM: &[u8] = "\u{FEFF}".as_bytes();

pub const HEADERS: [&str; 13] = [
    "Nom",
    "Référence",
    "N° de série",
    "Catégorie",
    "Statut",
    "État",
    "Marque",
    "Modèle",
    "Site",
    "Salle",
    "Assigné à",
    "Date d'acquisition",
    "Prix d'achat",
];

fn record(equipment: &Equipment, settings: &SettingsData) -> [String; 13] {
    let location = equipment.current_location.as_ref();
    [
        equipment.name.clone(),
        equipment.reference.clone(),
        equipment.serial_number.clone().unwrap_or_default(),
        settings.option_name(OptionList::Categories, equipment.category_id.as_deref()),
        settings.option_name(OptionList::Statuses, equipment.status_id.as_deref()),
        settings.option_name(OptionList::Conditions, equipment.condition_id.as_deref()),
        equipment.brand.clone().unwrap_or_default(),
        equipment.model.clone().unwrap_or_default(),
        location.map(|l| l.site_name.clone()).unwrap_or_default(),
        location.and_then(|l| l.room_name.clone()).unwrap_or_default(),
        equipment
            .current_assignment
            .as_ref()
            .map(|a| a.user_name.clone())
            .unwrap_or_default(),
        equipment
            .acquisition_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        equipment
            .purchase_price
            .map(|p| p.to_string())
            .unwrap_or_default(),
    ]
}

/// UTF-8 with BOM, `;` separated, every field quoted with inner quotes doubled
pub fn equipment_csv(rows: &[Equipment], settings: &SettingsData) -> AppResult<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .quote_style(QuoteStyle::Always)
        .from_writer(BOM.to_vec());

    let csv_err = |e: csv::Error| AppError::Internal(format!("CSV export failed: {}", e));

    writer.write_record(HEADERS).map_err(csv_err)?;
    for equipment in rows {
        writer.write_record(record(equipment, settings)).map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::equipment::sample;
    use csv::ReaderBuilder;

    #[test]
    fn test_bom_header_and_quoting() {
        let settings = SettingsData::default();
        let bytes = equipment_csv(&[sample(1, "Micro")], &settings).unwrap();
        assert!(bytes.starts_with(BOM));

        let text = String::from_utf8(bytes[BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("\"Nom\";\"Référence\";"));
        assert!(lines.next().unwrap().starts_with("\"Micro\";\"INV-0001\";\"\";"));
    }

    #[test]
    fn test_comma_and_quote_round_trip() {
        let settings = SettingsData::default();
        let name = "Câble \"XLR\", 10m; stéréo";
        let bytes = equipment_csv(&[sample(2, name)], &settings).unwrap();

        let text = String::from_utf8(bytes[BOM.len()..].to_vec()).unwrap();
        assert!(text.contains("\"Câble \"\"XLR\"\", 10m; stéréo\""));

        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .from_reader(text.as_bytes());
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], name);
        assert_eq!(row.len(), HEADERS.len());
    }

    #[test]
    fn test_option_ids_resolved_to_names() {
        let settings = SettingsData::default();
        let mut e = sample(3, "Console");
        e.category_id = Some(settings.categories[1].id.clone());
        e.status_id = Some("retired-legacy".to_string());
        let bytes = equipment_csv(&[e], &settings).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"Console\";\"INV-0003\";\"\";\"Console\";\"retired-legacy\""));
    }
}
