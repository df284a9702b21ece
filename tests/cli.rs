use clap::Parser;
use insta::assert_snapshot;
use lifxlan::mock::{MockConfig, MockService};
use lifxlan::{
    Color, FirmwareVersion, HardwareVersion, MessageType, PowerLevel, Rotation, Tile,
};
use pretty_assertions::assert_eq;
use serde_json::Value;

#[derive(Debug, Default)]
struct FakeTerminalClient;

impl lifxlan::TerminalClient for FakeTerminalClient {
    fn stdout_is_terminal(&self) -> bool {
        false
    }

    fn stderr_is_terminal(&self) -> bool {
        false
    }
}

async fn run_with_argv(argv: &[&str]) -> anyhow::Result<String> {
    let args = lifxlan::Args::try_parse_from(argv)?;
    let mut output = Vec::new();
    lifxlan::run_with_terminal(args, &mut output, &FakeTerminalClient).await?;
    Ok(String::from_utf8(output)?)
}

fn tile_config() -> MockConfig {
    MockConfig::builder()
        .label("Wall")
        .hardware(HardwareVersion {
            vendor_id: 1,
            product_id: 55,
            version: 0,
        })
        .firmware(FirmwareVersion::new(3, 70))
        .tiles(vec![
            Tile {
                user_x: 0.0,
                user_y: 0.0,
                width: 8,
                height: 8,
                rotation: Rotation::RightSideUp,
            },
            Tile {
                user_x: 1.0,
                user_y: 0.5,
                width: 8,
                height: 8,
                rotation: Rotation::RightSideUp,
            },
        ])
        .build()
}

#[tokio::test]
async fn info_reports_product_and_features_as_json() -> anyhow::Result<()> {
    let service = MockService::start(tile_config()).await?;
    let addr = service.addr().to_string();

    let stdout = run_with_argv(&[
        "lifxlan",
        "info",
        "--addr",
        &addr,
        "--target",
        "01:00:00:00:00:00",
    ])
    .await?;
    let report: Value = serde_json::from_str(&stdout)?;

    assert_eq!("01:00:00:00:00:00", report["target"]);
    assert_eq!("Wall", report["label"]);
    assert_eq!("LIFX Tile", report["product"]);
    assert_eq!(3, report["firmware"]["major"]);
    assert_eq!(true, report["features"]["matrix"]);
    assert_eq!(
        serde_json::json!([1500, 9000]),
        report["features"]["temperature_range"]
    );
    service.stop().await;
    Ok(())
}

#[tokio::test]
async fn power_on_switches_the_device() -> anyhow::Result<()> {
    let service = MockService::start(MockConfig::builder().build()).await?;
    let addr = service.addr().to_string();

    let stdout = run_with_argv(&[
        "lifxlan",
        "power",
        "on",
        "--addr",
        &addr,
        "--target",
        "01:00:00:00:00:00",
    ])
    .await?;

    assert_eq!(PowerLevel::ON, service.power());
    assert_snapshot!(stdout.trim_end(), @r#"
    {
      "action": "power",
      "target": "01:00:00:00:00:00",
      "power": "on"
    }
    "#);
    service.stop().await;
    Ok(())
}

#[tokio::test]
async fn tile_layout_draws_the_board() -> anyhow::Result<()> {
    let service = MockService::start(tile_config()).await?;
    let addr = service.addr().to_string();

    let stdout = run_with_argv(&["lifxlan", "tile", "layout", "--addr", &addr, "--output", "pretty"])
        .await?;

    assert_snapshot!(stdout.trim_end(), @r"
    ╭──────┬──────────┬──────┬─────────────╮
    │ tile │ position │ size │ rotation    │
    ├──────┼──────────┼──────┼─────────────┤
    │ 0    │ (0, 0)   │ 8x8  │ RightSideUp │
    │ 1    │ (1, 0.5) │ 8x8  │ RightSideUp │
    ╰──────┴──────────┴──────┴─────────────╯
    Board 16x12
    ........########
    ........########
    ........########
    ........########
    ################
    ################
    ################
    ################
    ########........
    ########........
    ########........
    ########........
    ");
    service.stop().await;
    Ok(())
}

#[tokio::test]
async fn tile_fill_paints_every_pixel() -> anyhow::Result<()> {
    let service = MockService::start(tile_config()).await?;
    let addr = service.addr().to_string();

    let stdout = run_with_argv(&[
        "lifxlan", "tile", "fill", "--colour", "0000ff", "--kelvin", "4000", "--addr", &addr,
    ])
    .await?;

    let blue = Color::from_rgb8(0, 0, 255, 4000);
    for tile in 0..2 {
        let pixels = service.tile_pixels(tile).expect("tile exists");
        assert!(pixels.iter().all(|pixel| *pixel == blue), "tile {tile}");
    }
    let result: Value = serde_json::from_str(&stdout)?;
    assert_eq!("tile_fill", result["action"]);
    assert_eq!(2, result["tiles"]);
    service.stop().await;
    Ok(())
}

#[tokio::test]
async fn discover_lists_devices_behind_the_broadcast_address() -> anyhow::Result<()> {
    let service = MockService::start(tile_config()).await?;
    let broadcast = service.addr().to_string();

    let stdout = run_with_argv(&[
        "lifxlan",
        "discover",
        "--broadcast",
        &broadcast,
        "--timeout",
        "300ms",
    ])
    .await?;
    let reports: Value = serde_json::from_str(&stdout)?;

    assert_eq!(1, reports.as_array().map_or(0, Vec::len));
    assert_eq!("Wall", reports[0]["label"]);
    assert_eq!("LIFX Tile", reports[0]["product"]);
    assert_eq!(broadcast, reports[0]["addr"]);
    service.stop().await;
    Ok(())
}

#[tokio::test]
async fn info_finds_the_target_through_discovery() -> anyhow::Result<()> {
    let service = MockService::start(tile_config()).await?;
    let broadcast = service.addr().to_string();

    let stdout = run_with_argv(&[
        "lifxlan",
        "--broadcast",
        &broadcast,
        "info",
        "--target",
        "01:00:00:00:00:00",
    ])
    .await?;
    let report: Value = serde_json::from_str(&stdout)?;

    assert_eq!("Wall", report["label"]);
    assert_eq!(broadcast, report["addr"]);
    assert_eq!(
        vec![
            MessageType::GET_SERVICE,
            MessageType::GET_LABEL,
            MessageType::GET_VERSION,
            MessageType::GET_HOST_FIRMWARE,
        ],
        service.received()
    );
    service.stop().await;
    Ok(())
}

#[tokio::test]
async fn tile_commands_fail_for_plain_lights() -> anyhow::Result<()> {
    let service = MockService::start(MockConfig::builder().build()).await?;
    let addr = service.addr().to_string();

    let error = run_with_argv(&["lifxlan", "tile", "layout", "--addr", &addr])
        .await
        .expect_err("mock has no tiles");

    assert_eq!(
        "failed to read the tile chain of 00:00:00:00:00:00: device does not handle message type GetDeviceChain(701)",
        format!("{error:#}")
    );
    service.stop().await;
    Ok(())
}
