use csv::Writer;
use hifitime::Epoch;
use ionolayer::layer::elaz_mesh;
use ionolayer::models::ChapmanModel;
use ionolayer::evaluator::{available_parallelism, build_pool};
use ionolayer::{CollisionModel, DLayer, EvaluatorConfig, LayerSpec, ModelEvaluator, ObserverPosition};
use log::info;
use std::error::Error;
use std::io;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Observer in the Netherlands at local noon
    let position = ObserverPosition::new(52.91, 6.87, 0.0);
    let epoch = Epoch::from_gregorian_utc(2024, 3, 15, 12, 0, 0, 0);
    let freq = 40.0; // MHz
    let gridsize = 30;

    let evaluator = ModelEvaluator::new(Arc::new(ChapmanModel::default()), EvaluatorConfig::default());
    let pool = build_pool(available_parallelism())?;
    let dlayer = DLayer::compute(position, LayerSpec::d_layer(epoch), &evaluator, Some(&pool))?;

    let (el, az) = elaz_mesh(gridsize);
    let atten = dlayer.atten(&el, &az, freq, CollisionModel::default(), true)?;
    let density = dlayer.ed(&el, &az, None)?;
    info!("attenuation computed on a {}x{} sky mesh", gridsize, gridsize);

    let (Some(el), Some(az), Some(atten), Some(density)) =
        (el.as_array(), az.as_array(), atten.as_array(), density.as_array())
    else {
        return Err("sky mesh lost its shape".into());
    };

    let mut writer = Writer::from_writer(io::stdout());
    writer.write_record([
        "Elevation (deg)",
        "Azimuth (deg)",
        "Frequency (MHz)",
        "Electron Density (m^-3)",
        "Attenuation",
    ])?;
    for ((el, az), (density, atten)) in el.iter().zip(az.iter()).zip(density.iter().zip(atten.iter())) {
        writer.write_record(&[
            el.to_string(),
            az.to_string(),
            freq.to_string(),
            density.to_string(),
            atten.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
