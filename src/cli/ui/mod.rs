mod device_view;
mod painter;
mod table;
mod tile_view;

pub(crate) use self::device_view::{DeviceListView, DeviceReportView};
pub(crate) use self::painter::Painter;
pub(crate) use self::tile_view::TileLayoutView;
