use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;

const COLUMNS: [&str; 9] = [
    "name",
    "ingredients",
    "diet",
    "prep_time",
    "cook_time",
    "flavor_profile",
    "course",
    "state",
    "region",
];

struct Food {
    name: &'static str,
    ingredients: &'static str,
    diet: &'static str,
    prep_time: i64,
    cook_time: i64,
    flavor_profile: &'static str,
    course: &'static str,
    state: &'static str,
    region: &'static str,
}

/// A handful of dishes, including rows that carry the `-1` placeholder so
/// the cleaner has something to drop.
const FOODS: &[Food] = &[
    Food {
        name: "Balu shahi",
        ingredients: "Maida flour, yogurt, oil, sugar",
        diet: "vegetarian",
        prep_time: 45,
        cook_time: 25,
        flavor_profile: "sweet",
        course: "dessert",
        state: "West Bengal",
        region: "East",
    },
    Food {
        name: "Boondi",
        ingredients: "Gram flour, ghee, sugar",
        diet: "vegetarian",
        prep_time: 80,
        cook_time: 30,
        flavor_profile: "sweet",
        course: "dessert",
        state: "Rajasthan",
        region: "West",
    },
    Food {
        name: "Gajar ka halwa",
        ingredients: "Carrots, milk, sugar, ghee, cashews, raisins",
        diet: "vegetarian",
        prep_time: 15,
        cook_time: 60,
        flavor_profile: "sweet",
        course: "dessert",
        state: "Punjab",
        region: "North",
    },
    Food {
        name: "Ghevar",
        ingredients: "Flour, ghee, kewra, milk, clarified butter, sugar, almonds, pistachio, saffron, green cardamom",
        diet: "vegetarian",
        prep_time: 15,
        cook_time: 30,
        flavor_profile: "sweet",
        course: "dessert",
        state: "Rajasthan",
        region: "West",
    },
    Food {
        name: "Chicken Tikka masala",
        ingredients: "Chicken thighs, whole wheat naan, garam masala powder, tomato sauce, greek yogurt",
        diet: "non vegetarian",
        prep_time: 120,
        cook_time: 30,
        flavor_profile: "spicy",
        course: "main course",
        state: "Punjab",
        region: "North",
    },
    Food {
        name: "Dal makhani",
        ingredients: "Urad dal, kidney beans, butter, cream, garam masala",
        diet: "vegetarian",
        prep_time: 10,
        cook_time: 60,
        flavor_profile: "spicy",
        course: "main course",
        state: "Punjab",
        region: "North",
    },
    Food {
        name: "Pakora",
        ingredients: "Gram flour, onion, chili, oil",
        diet: "vegetarian",
        prep_time: 10,
        cook_time: 15,
        flavor_profile: "spicy",
        course: "snack",
        state: "-1",
        region: "-1",
    },
    Food {
        name: "Dhokla",
        ingredients: "Besan, curd, soda, ginger, green chili",
        diet: "vegetarian",
        prep_time: 15,
        cook_time: 30,
        flavor_profile: "spicy",
        course: "snack",
        state: "Gujarat",
        region: "West",
    },
    Food {
        name: "Chikki",
        ingredients: "Peanuts, jaggery, ghee",
        diet: "vegetarian",
        prep_time: -1,
        cook_time: 20,
        flavor_profile: "sweet",
        course: "snack",
        state: "Maharashtra",
        region: "West",
    },
    Food {
        name: "Misti doi",
        ingredients: "Milk, jaggery",
        diet: "vegetarian",
        prep_time: 480,
        cook_time: 30,
        flavor_profile: "sweet",
        course: "dessert",
        state: "West Bengal",
        region: "East",
    },
    Food {
        name: "Aloo tikki",
        ingredients: "Potato, peas, chili, ginger, oil",
        diet: "vegetarian",
        prep_time: 10,
        cook_time: 20,
        flavor_profile: "-1",
        course: "snack",
        state: "Delhi",
        region: "North",
    },
];

fn write_csv(path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record(COLUMNS)?;
    for f in FOODS {
        let prep_time = f.prep_time.to_string();
        let cook_time = f.cook_time.to_string();
        writer.write_record([
            f.name,
            f.ingredients,
            f.diet,
            prep_time.as_str(),
            cook_time.as_str(),
            f.flavor_profile,
            f.course,
            f.state,
            f.region,
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn build_batch() -> Result<RecordBatch> {
    let text = |get: fn(&Food) -> &'static str| -> ArrayRef {
        Arc::new(StringArray::from(FOODS.iter().map(get).collect::<Vec<_>>()))
    };
    let number = |get: fn(&Food) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from(FOODS.iter().map(get).collect::<Vec<_>>()))
    };

    let fields: Vec<Field> = COLUMNS
        .iter()
        .map(|&name| {
            let dtype = if name.ends_with("_time") { DataType::Int64 } else { DataType::Utf8 };
            Field::new(name, dtype, false)
        })
        .collect();

    let batch = RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        vec![
            text(|f| f.name),
            text(|f| f.ingredients),
            text(|f| f.diet),
            number(|f| f.prep_time),
            number(|f| f.cook_time),
            text(|f| f.flavor_profile),
            text(|f| f.course),
            text(|f| f.state),
            text(|f| f.region),
        ],
    )
    .context("building record batch")?;
    Ok(batch)
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_default();
    if !out_dir.as_os_str().is_empty() {
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("creating {}", out_dir.display()))?;
    }

    let csv_path = out_dir.join("sample_food.csv");
    write_csv(&csv_path)?;

    let batch = build_batch()?;
    let parquet_path = out_dir.join("sample_food.parquet");
    let file = std::fs::File::create(&parquet_path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;

    println!("{}", pretty_format_batches(&[batch.clone()])?);
    println!(
        "Wrote {} foods to {} and {}",
        batch.num_rows(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
