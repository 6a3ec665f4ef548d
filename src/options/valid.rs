// Option keys the plot front end accepts. The registry must declare exactly these.

pub const VALID_OPTIONS: &[&str] = &[
    // data
    "x",
    "y",
    "xerr",
    "yerr",
    // parameter box
    "parameter",
    "parameter_loc",
    // manipulation
    "acc",
    "triconv",
    "dsel",
    "psel",
    "linreg",
    // destination
    "o",
    // style
    "alpha",
    "fontsize",
    "title",
    "size_inch",
    "style",
    "xticks",
    "yticks",
    "xlabel",
    "ylabel",
    "ylabel2",
    "xlim",
    "ylim",
    "border",
    "markersize",
    "legend_loc",
    "ncol",
];
